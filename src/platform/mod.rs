//! OS primitives used by the capture pipeline.
//!
//! Capture only works on Windows. Everything the pipeline needs from the OS goes
//! through [`PlatformCapture`]; `Win32Platform` implements it with GDI and DWM,
//! and a stub that never finds a window is compiled on other targets so the rest
//! of the crate builds and tests everywhere.

use crate::capture::region::{Point, Rect, Size};
use crate::error::Result;

/// Opaque identifier of a top-level OS window.
///
/// This is a lookup key, not an owner: the window can disappear at any time and
/// every use must tolerate that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub usize);

/// Whether enumeration should go on after visiting a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enumeration {
    Continue,
    Stop,
}

/// An OS drawing surface that can be painted into.
///
/// Pixel-bound surfaces expose their storage through [`pixels`](Self::pixels):
/// the slice is the memory the OS paints into, so publishing it involves no
/// intermediate copy. Scratch surfaces have no CPU-visible storage.
pub trait DrawingSurface: Send {
    /// Surface dimensions.
    fn size(&self) -> Size;

    /// BGRA8 storage, `size().byte_len()` bytes, top row first. `None` for
    /// scratch surfaces and after release.
    fn pixels(&self) -> Option<&[u8]>;

    /// Unbinds and destroys the OS objects. Safe to call more than once.
    fn release(&mut self);
}

/// Capability interface over the OS window and drawing APIs.
pub trait PlatformCapture: Send + Sync + 'static {
    type Surface: DrawingSurface;

    /// Visits every top-level window in OS order until `visit` returns
    /// [`Enumeration::Stop`].
    fn enumerate_windows(&self, visit: &mut dyn FnMut(WindowHandle) -> Enumeration);

    /// Window title, or `None` if it cannot be read.
    fn window_title(&self, window: WindowHandle) -> Option<String>;

    /// Whether the handle still refers to a live window.
    fn is_window(&self, window: WindowHandle) -> bool;

    /// Outer window rectangle in screen coordinates, drop shadow included.
    fn window_rect(&self, window: WindowHandle) -> Result<Rect>;

    /// Visible window rectangle in screen coordinates, drop shadow excluded.
    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<Rect>;

    /// Creates a surface whose storage is CPU-readable BGRA8 memory.
    fn create_pixel_surface(&self, window: WindowHandle, size: Size) -> Result<Self::Surface>;

    /// Creates an intermediate surface compatible with `window`.
    fn create_scratch_surface(&self, window: WindowHandle, size: Size) -> Result<Self::Surface>;

    /// Paints the whole window into `target` at (0, 0), including content that
    /// is occluded or off-screen.
    fn paint_window(&self, window: WindowHandle, target: &mut Self::Surface) -> Result<()>;

    /// Copies `size` pixels starting at `source_origin` in `source` to (0, 0)
    /// in `target`.
    fn blit(
        &self,
        source: &Self::Surface,
        source_origin: Point,
        size: Size,
        target: &mut Self::Surface,
    ) -> Result<()>;
}

// ── Platform split ─────────────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod win32;
#[cfg(target_os = "windows")]
pub use win32::{GdiSurface, Win32Platform};

/// Platform selected for the current build target.
#[cfg(target_os = "windows")]
pub type DefaultPlatform = Win32Platform;

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
pub use stub::{StubPlatform, StubSurface};

/// Platform selected for the current build target.
#[cfg(not(target_os = "windows"))]
pub type DefaultPlatform = StubPlatform;

#[cfg(test)]
pub(crate) mod fake;
