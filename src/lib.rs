//! Window Capture 2D
//!
//! Periodically captures a top-level window, found by title, into a BGRA8
//! frame buffer on a background thread and publishes each frame to a texture
//! supplied by the caller.

pub mod capture;
pub mod config;
pub mod error;
pub mod paths;
pub mod platform;
pub mod snapshot;
pub mod texture;

pub use capture::{CaptureSession, SessionState, SubscriptionId};
pub use config::{AppConfig, CaptureProperties, TitleMatching};
pub use error::{CaptureError, Result};
pub use platform::{DefaultPlatform, PlatformCapture, WindowHandle};
pub use texture::{SharedTexture, SharedTextureAllocator, TextureAllocator, TextureSink};
