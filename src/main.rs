//! Window Capture 2D
//!
//! Captures the window named in config.json for a while, logging texture
//! changes and saving periodic PNG snapshots of the live texture.
//!
//! Usage:
//!   window-capture2d                 capture using config.json
//!   window-capture2d --list          list capturable window titles
//!   window-capture2d --write-config  write a default config.json

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use window_capture2d::capture::list_window_titles;
use window_capture2d::{
    paths, snapshot, AppConfig, CaptureSession, DefaultPlatform, SharedTexture, TextureSink,
};

const LOG_FILE_NAME: &str = "window_capture.log";

/// Logs to stdout and appends to `<exe_dir>/logs/window_capture.log`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false);

    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => builder
            .with_writer(std::io::stdout.and(Mutex::new(file)))
            .init(),
        Err(e) => {
            builder.init();
            tracing::warn!("Could not open log file {}: {}", log_path.display(), e);
        }
    }
}

/// Records panics in the log before the default hook runs.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        tracing::error!("[PANIC]{} {}", location, msg);
        default_hook(panic_info);
    }));
}

fn main() -> Result<()> {
    let dirs_ready = paths::ensure_directories();
    init_logging();
    install_panic_hook();
    dirs_ready.context("Failed to create output directories")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--list") {
        list_windows();
        return Ok(());
    }
    if args.iter().any(|a| a == "--write-config") {
        let path = paths::get_config_path();
        AppConfig::save_default(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Default config written to {}", path.display());
        return Ok(());
    }

    let config = AppConfig::load(&paths::get_config_path());
    run_capture(&config)
}

fn list_windows() {
    let windows = list_window_titles(&DefaultPlatform::default());
    tracing::info!("{} titled windows:", windows.len());
    for (handle, title) in windows {
        tracing::info!("  [{:?}] \"{}\"", handle, title);
    }
}

/// Runs one capture session for `config.run_seconds`.
fn run_capture(config: &AppConfig) -> Result<()> {
    let mut session =
        CaptureSession::new(config.capture.clone()).context("Invalid capture properties")?;

    let latest: Arc<Mutex<LatestTexture>> = Arc::new(Mutex::new(LatestTexture::default()));
    let latest_clone = latest.clone();
    session.subscribe(move |texture| {
        match &texture {
            Some(t) => tracing::info!("Texture changed: {}x{}", t.width(), t.height()),
            None => tracing::info!("Target window gone; capture idle"),
        }
        if let Ok(mut latest) = latest_clone.lock() {
            latest.announce(texture);
        }
    });

    let Some(initial) = session.start().context("Failed to start capture session")? else {
        tracing::warn!(
            "No window matches \"{}\" ({:?}). Run with --list to see open windows.",
            config.capture.target_title,
            config.capture.title_matching
        );
        session.close();
        return Ok(());
    };
    tracing::info!(
        "Capturing {}x{} for {}s",
        initial.width(),
        initial.height(),
        config.run_seconds
    );
    if let Ok(mut latest) = latest.lock() {
        latest.seed(initial);
    }

    let run_for = Duration::from_secs(config.run_seconds);
    let snapshot_every = Duration::from_secs(config.snapshot_interval_secs);
    let started = Instant::now();
    let mut last_snapshot = Instant::now();

    while started.elapsed() < run_for {
        std::thread::sleep(Duration::from_millis(100));
        if !snapshot_every.is_zero() && last_snapshot.elapsed() >= snapshot_every {
            save_latest(&latest);
            last_snapshot = Instant::now();
        }
    }

    session.close();
    save_latest(&latest);

    let stats = session.stats();
    tracing::info!(
        "Done: {} cycles, {} frames published, {} size changes, {} failed captures",
        stats.cycles(),
        stats.frames_published(),
        stats.texture_changes(),
        stats.failed_pulls()
    );
    Ok(())
}

/// Texture last announced by the session.
#[derive(Default)]
struct LatestTexture {
    texture: Option<Arc<SharedTexture>>,
    /// Set once any "texture changed" notification arrived
    changed: bool,
}

impl LatestTexture {
    fn announce(&mut self, texture: Option<Arc<SharedTexture>>) {
        self.texture = texture;
        self.changed = true;
    }

    /// Stores the texture returned by `start` unless the worker has already
    /// replaced or dropped it.
    fn seed(&mut self, initial: Arc<SharedTexture>) {
        if !self.changed {
            self.texture = Some(initial);
        }
    }
}

fn save_latest(latest: &Mutex<LatestTexture>) {
    let texture = latest.lock().ok().and_then(|t| t.texture.clone());
    let Some(texture) = texture.filter(|t| t.version() > 0) else {
        tracing::debug!("No captured frame to snapshot yet");
        return;
    };
    if let Err(e) = snapshot::save_snapshot(&texture, &paths::get_snapshots_dir()) {
        tracing::warn!("Snapshot failed: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_fills_empty_slot() {
        let mut latest = LatestTexture::default();
        latest.seed(Arc::new(SharedTexture::new(4, 4)));

        assert_eq!(latest.texture.map(|t| t.width()), Some(4));
    }

    #[test]
    fn test_seed_keeps_window_gone_notification() {
        let mut latest = LatestTexture::default();
        latest.announce(None);
        latest.seed(Arc::new(SharedTexture::new(4, 4)));

        assert!(latest.texture.is_none());
    }

    #[test]
    fn test_seed_keeps_newer_texture() {
        let mut latest = LatestTexture::default();
        latest.announce(Some(Arc::new(SharedTexture::new(8, 6))));
        latest.seed(Arc::new(SharedTexture::new(4, 4)));

        assert_eq!(latest.texture.map(|t| t.width()), Some(8));
    }
}
