//! Capture session: window resolution at start, then a periodic capture cycle
//! on a dedicated worker thread until the session is closed.
//!
//! The worker owns all mutable capture state (target, geometry, frame buffer)
//! for as long as it runs. `close` signals it, joins it, takes that state back
//! and releases the buffer, so no cycle can overlap teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::capture::events::{SubscriptionId, Subscribers};
use crate::capture::frame::FrameBuffer;
use crate::capture::region::{compute_geometry, WindowGeometry};
use crate::capture::window::{locate, TitleMatcher};
use crate::config::CaptureProperties;
use crate::error::{CaptureError, Result};
use crate::platform::{DefaultPlatform, PlatformCapture, WindowHandle};
use crate::texture::{SharedTextureAllocator, TextureAllocator};

/// Session lifecycle. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Counters updated by the worker, readable from any thread.
#[derive(Debug, Default)]
pub struct CaptureStats {
    cycles: AtomicU64,
    frames_published: AtomicU64,
    texture_changes: AtomicU64,
    failed_pulls: AtomicU64,
}

impl CaptureStats {
    /// Cycles run, including no-op cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::Relaxed)
    }

    pub fn texture_changes(&self) -> u64 {
        self.texture_changes.load(Ordering::Relaxed)
    }

    /// Cycles whose paint or blit failed.
    pub fn failed_pulls(&self) -> u64 {
        self.failed_pulls.load(Ordering::Relaxed)
    }
}

type Frame<P, A> =
    FrameBuffer<<P as PlatformCapture>::Surface, <A as TextureAllocator>::Texture>;

/// Everything a capture cycle reads and writes. Owned by the worker while the
/// session runs.
struct CaptureCycle<P: PlatformCapture, A: TextureAllocator> {
    platform: Arc<P>,
    textures: Arc<A>,
    check_window_size: bool,
    trim_shadow: bool,
    target: Option<WindowHandle>,
    geometry: WindowGeometry,
    frame: Option<Frame<P, A>>,
    subscribers: Subscribers<A::Texture>,
    stats: Arc<CaptureStats>,
    pulls_failing: bool,
    allocations_failing: bool,
}

impl<P: PlatformCapture, A: TextureAllocator> CaptureCycle<P, A> {
    /// Resolves the target window and allocates the first buffer.
    fn acquire(&mut self, matcher: &TitleMatcher, title: &str) -> Option<A::Texture> {
        let Some(target) = locate(&*self.platform, matcher) else {
            tracing::info!("No window matches \"{}\"", title);
            return None;
        };
        self.target = Some(target);
        self.geometry = compute_geometry(&*self.platform, target, self.trim_shadow);
        tracing::info!(
            "Target window {:?}: {}x{} capture region at offset ({}, {})",
            target,
            self.geometry.capture_size.width,
            self.geometry.capture_size.height,
            self.geometry.capture_offset.x,
            self.geometry.capture_offset.y
        );

        match self.allocate(target) {
            Ok(Some(frame)) => {
                let texture = frame.texture().clone();
                self.frame = Some(frame);
                Some(texture)
            }
            Ok(None) => {
                tracing::info!("Target window has no area; capture idle");
                self.target = None;
                None
            }
            // The worker retries while the target is set and the frame is not
            Err(_) => None,
        }
    }

    fn allocate(&mut self, target: WindowHandle) -> Result<Option<Frame<P, A>>> {
        let result = FrameBuffer::allocate(
            &*self.platform,
            target,
            &self.geometry,
            self.trim_shadow,
            &*self.textures,
        );
        match &result {
            Ok(_) => {
                if self.allocations_failing {
                    tracing::info!("Frame buffer allocation recovered");
                    self.allocations_failing = false;
                }
            }
            Err(e) if self.allocations_failing => {
                tracing::debug!("Frame buffer allocation failed: {}", e)
            }
            Err(e) => {
                tracing::warn!("Frame buffer allocation failed, retrying each cycle: {}", e);
                self.allocations_failing = true;
            }
        }
        result
    }

    /// Allocates a buffer for `self.geometry` in place of a dropped or missing
    /// one and notifies subscribers.
    ///
    /// Returns false when there is nothing to capture this cycle. A zero-area
    /// geometry ends capture for good; an allocation failure is retried on the
    /// next cycle.
    fn replace_frame(&mut self, target: WindowHandle) -> bool {
        match self.allocate(target) {
            Ok(Some(frame)) => {
                let texture = frame.texture().clone();
                self.frame = Some(frame);
                self.stats.texture_changes.fetch_add(1, Ordering::Relaxed);
                self.subscribers.emit(Some(texture));
                true
            }
            Ok(None) => {
                tracing::info!("Target window gone or has no area; capture idle");
                self.target = None;
                self.stats.texture_changes.fetch_add(1, Ordering::Relaxed);
                self.subscribers.emit(None);
                false
            }
            Err(_) => false,
        }
    }

    /// One capture cycle. Failures are logged and never stop the session.
    fn run_once(&mut self) {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        let Some(target) = self.target else {
            return;
        };

        if self.check_window_size {
            self.geometry = compute_geometry(&*self.platform, target, self.trim_shadow);

            if let Some(current_size) = self.frame.as_ref().map(|f| f.size()) {
                if self.geometry.capture_size != current_size {
                    tracing::info!(
                        "Capture size changed {}x{} -> {}x{}",
                        current_size.width,
                        current_size.height,
                        self.geometry.capture_size.width,
                        self.geometry.capture_size.height
                    );
                    if let Some(mut old) = self.frame.take() {
                        old.release();
                    }
                }
            }
        }

        if self.frame.is_none() && !self.replace_frame(target) {
            return;
        }
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        if self.trim_shadow && frame.scratch_size() != Some(self.geometry.outer_size) {
            // Without a scratch surface of the current outer size the trimmed
            // region cannot be copied out; try again next cycle
            if let Err(e) = frame.resize_scratch(&*self.platform, target, self.geometry.outer_size)
            {
                tracing::warn!("Scratch surface reallocation failed: {}", e);
                return;
            }
        }

        match frame.pull(&*self.platform, target, &self.geometry) {
            Ok(()) => {
                if self.pulls_failing {
                    tracing::info!("Window capture recovered");
                    self.pulls_failing = false;
                }
            }
            Err(e) => {
                self.stats.failed_pulls.fetch_add(1, Ordering::Relaxed);
                if self.pulls_failing {
                    tracing::debug!("Window capture failed: {}", e);
                } else {
                    tracing::warn!("Window capture failed: {}", e);
                    self.pulls_failing = true;
                }
            }
        }

        if frame.publish() {
            self.stats.frames_published.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn release(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            frame.release();
        }
        self.target = None;
        self.geometry = WindowGeometry::ZERO;
    }
}

struct CaptureWorker<P: PlatformCapture, A: TextureAllocator> {
    stop: Sender<()>,
    handle: JoinHandle<CaptureCycle<P, A>>,
}

/// Runs cycles every `period` until told to stop, then hands the state back.
///
/// An overrunning cycle is followed immediately by the next one; missed ticks
/// are not made up.
fn run_worker<P: PlatformCapture, A: TextureAllocator>(
    mut cycle: CaptureCycle<P, A>,
    period: Duration,
    stop: Receiver<()>,
) -> CaptureCycle<P, A> {
    let mut next_tick = Instant::now();
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        cycle.run_once();

        next_tick += period;
        let now = Instant::now();
        if next_tick < now {
            next_tick = now;
        }
    }
    tracing::debug!("Capture worker finished after {} cycles", cycle.stats.cycles());
    cycle
}

/// Periodic capture of one window into a texture.
pub struct CaptureSession<
    P: PlatformCapture = DefaultPlatform,
    A: TextureAllocator = SharedTextureAllocator,
> {
    platform: Arc<P>,
    textures: Arc<A>,
    properties: CaptureProperties,
    matcher: TitleMatcher,
    subscribers: Subscribers<A::Texture>,
    stats: Arc<CaptureStats>,
    state: SessionState,
    worker: Option<CaptureWorker<P, A>>,
}

impl CaptureSession {
    /// Session on the platform for this build target, publishing into
    /// [`SharedTexture`](crate::texture::SharedTexture)s.
    pub fn new(properties: CaptureProperties) -> Result<Self> {
        Self::with_platform(DefaultPlatform::default(), SharedTextureAllocator, properties)
    }
}

impl<P: PlatformCapture, A: TextureAllocator> CaptureSession<P, A> {
    /// Validates `properties` and creates an idle session.
    pub fn with_platform(platform: P, textures: A, properties: CaptureProperties) -> Result<Self> {
        properties.validate()?;
        let matcher = TitleMatcher::new(properties.title_matching, &properties.target_title)?;

        Ok(Self {
            platform: Arc::new(platform),
            textures: Arc::new(textures),
            properties,
            matcher,
            subscribers: Subscribers::default(),
            stats: Arc::new(CaptureStats::default()),
            state: SessionState::Idle,
            worker: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn properties(&self) -> &CaptureProperties {
        &self.properties
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Registers a "texture changed" callback.
    ///
    /// Callbacks run on the capture worker thread; keep them short. They get
    /// `None` when the window disappears.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<A::Texture>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.subscribers.subscribe(callback);
        tracing::debug!("Texture subscriber added ({} registered)", self.subscribers.len());
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Locates the target window, allocates the first buffer and starts the
    /// worker.
    ///
    /// Returns the initial texture, or `None` if no window matched, it has no
    /// area or its buffer could not be allocated. The worker runs either way.
    /// Without a target its cycles do nothing; a failed allocation is retried
    /// each cycle and announced through the "texture changed" callbacks once
    /// it succeeds.
    pub fn start(&mut self) -> Result<Option<A::Texture>> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Running => return Err(CaptureError::AlreadyRunning),
            SessionState::Closed => return Err(CaptureError::SessionClosed),
        }

        let mut cycle = CaptureCycle {
            platform: self.platform.clone(),
            textures: self.textures.clone(),
            check_window_size: self.properties.check_window_size,
            trim_shadow: self.properties.cut_shadow,
            target: None,
            geometry: WindowGeometry::ZERO,
            frame: None,
            subscribers: self.subscribers.clone(),
            stats: self.stats.clone(),
            pulls_failing: false,
            allocations_failing: false,
        };
        let texture = cycle.acquire(&self.matcher, &self.properties.target_title);

        let period = Duration::from_secs_f64(1.0 / f64::from(self.properties.frame_rate));
        let (stop_tx, stop_rx) = channel();
        let handle = thread::Builder::new()
            .name("window-capture".to_string())
            .spawn(move || run_worker(cycle, period, stop_rx))
            .map_err(CaptureError::WorkerSpawn)?;

        self.worker = Some(CaptureWorker {
            stop: stop_tx,
            handle,
        });
        self.state = SessionState::Running;
        tracing::info!(
            "Capture session started at {} fps (window found: {})",
            self.properties.frame_rate,
            texture.is_some()
        );

        Ok(texture)
    }

    /// Stops the worker, waits for it and releases every capture resource.
    ///
    /// Blocks until any in-flight cycle has finished. Calling it again does
    /// nothing.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            match worker.handle.join() {
                Ok(mut cycle) => cycle.release(),
                Err(_) => tracing::error!("Capture worker panicked"),
            }
        }

        self.state = SessionState::Closed;
        tracing::info!(
            "Capture session closed ({} frames published)",
            self.stats.frames_published()
        );
    }
}

impl<P: PlatformCapture, A: TextureAllocator> Drop for CaptureSession<P, A> {
    fn drop(&mut self) {
        self.close();
    }
}
