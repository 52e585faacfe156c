//! Non-Windows stub (CI + cross-compilation).
//!
//! Enumerates no windows, so sessions start without a target and every cycle
//! is a no-op.

use super::{DrawingSurface, Enumeration, PlatformCapture, WindowHandle};
use crate::capture::region::{Point, Rect, Size};
use crate::error::{CaptureError, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct StubPlatform;

#[derive(Debug)]
pub struct StubSurface {
    size: Size,
}

impl DrawingSurface for StubSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn pixels(&self) -> Option<&[u8]> {
        None
    }

    fn release(&mut self) {}
}

fn unsupported(call: &'static str) -> CaptureError {
    CaptureError::platform(call, "window capture is only supported on Windows")
}

impl PlatformCapture for StubPlatform {
    type Surface = StubSurface;

    fn enumerate_windows(&self, _visit: &mut dyn FnMut(WindowHandle) -> Enumeration) {
        tracing::debug!("enumerate_windows stub (non-Windows): no windows");
    }

    fn window_title(&self, _window: WindowHandle) -> Option<String> {
        None
    }

    fn is_window(&self, _window: WindowHandle) -> bool {
        false
    }

    fn window_rect(&self, _window: WindowHandle) -> Result<Rect> {
        Err(unsupported("GetWindowRect"))
    }

    fn extended_frame_bounds(&self, _window: WindowHandle) -> Result<Rect> {
        Err(unsupported("DwmGetWindowAttribute"))
    }

    fn create_pixel_surface(&self, _window: WindowHandle, _size: Size) -> Result<StubSurface> {
        Err(unsupported("CreateDIBSection"))
    }

    fn create_scratch_surface(&self, _window: WindowHandle, _size: Size) -> Result<StubSurface> {
        Err(unsupported("CreateCompatibleBitmap"))
    }

    fn paint_window(&self, _window: WindowHandle, _target: &mut StubSurface) -> Result<()> {
        Err(unsupported("PrintWindow"))
    }

    fn blit(
        &self,
        _source: &StubSurface,
        _source_origin: Point,
        _size: Size,
        _target: &mut StubSurface,
    ) -> Result<()> {
        Err(unsupported("BitBlt"))
    }
}
