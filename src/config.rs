//! Configuration types for window capture.
//!
//! `CaptureProperties` is handed to a session once and never changes for its
//! lifetime. `AppConfig` wraps it with the settings the bundled binary needs and
//! is loaded from config.json next to the executable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CaptureError, Result};

/// How the target title is compared against window titles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleMatching {
    /// Case-insensitive full equality
    #[default]
    PerfectMatch,
    /// Case-insensitive prefix
    ForwardMatch,
    /// Case-insensitive suffix
    BackwardMatch,
    /// Case-insensitive substring
    PartialMatch,
    /// Regular expression found anywhere in the title
    RegularExpression,
}

/// Settings for a single capture session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureProperties {
    /// Captures per second
    pub frame_rate: u32,
    /// Title (or pattern) of the window to capture
    pub target_title: String,
    /// How `target_title` is matched
    pub title_matching: TitleMatching,
    /// Re-read the window size every cycle and reallocate on change
    pub check_window_size: bool,
    /// Capture only the extended frame bounds, dropping the drop shadow
    pub cut_shadow: bool,
}

impl Default for CaptureProperties {
    fn default() -> Self {
        Self {
            frame_rate: 15,
            target_title: String::new(),
            title_matching: TitleMatching::PerfectMatch,
            check_window_size: true,
            cut_shadow: true,
        }
    }
}

impl CaptureProperties {
    /// Convenience constructor with default flags.
    pub fn new(target_title: impl Into<String>, title_matching: TitleMatching) -> Self {
        Self {
            target_title: target_title.into(),
            title_matching,
            ..Self::default()
        }
    }

    /// Checks the values that cannot be represented by the types alone.
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(CaptureError::InvalidFrameRate(self.frame_rate));
        }
        Ok(())
    }
}

/// Configuration for the window-capture binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture session settings
    pub capture: CaptureProperties,
    /// How long to keep the session running (seconds)
    pub run_seconds: u64,
    /// Interval between PNG snapshots of the live texture (seconds, 0 = only at the end)
    pub snapshot_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureProperties::default(),
            run_seconds: 10,
            snapshot_interval_secs: 5,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `config_path`, or returns defaults if the file
    /// is missing or cannot be parsed.
    pub fn load(config_path: &Path) -> Self {
        tracing::info!("Looking for config at: {}", config_path.display());

        if !config_path.exists() {
            tracing::info!("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config.json: {}. Using defaults.", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config.json: {}. Using defaults.", e);
            }
        }

        Self::default()
    }

    /// Writes the default configuration to `config_path` for reference.
    pub fn save_default(config_path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(config_path, json)
    }
}
