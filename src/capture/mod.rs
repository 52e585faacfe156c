//! Window capture pipeline.
//!
//! This module provides:
//! - Window discovery by title (`window`)
//! - Capture region and shadow trimming (`region`)
//! - Frame buffer allocation and publishing (`frame`)
//! - "Texture changed" notifications (`events`)
//! - The periodic capture session (`session`)

pub mod events;
pub mod frame;
pub mod region;
pub mod session;
pub mod window;

pub use events::{SubscriptionId, Subscribers};
pub use frame::FrameBuffer;
pub use region::{compute_geometry, Point, Rect, Size, WindowGeometry};
pub use session::{CaptureSession, CaptureStats, SessionState};
pub use window::{list_window_titles, locate, TitleMatcher};
