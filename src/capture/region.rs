//! Window bounds and shadow-trimmed capture region.

use crate::platform::{PlatformCapture, WindowHandle};

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes needed for a BGRA8 image of this size.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Per-axis minimum of two sizes.
    pub fn min(self, other: Size) -> Size {
        Size {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }
}

/// Signed pixel offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen-space rectangle as reported by the OS (right/bottom exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Dimensions, treating inverted rectangles as empty.
    pub fn size(&self) -> Size {
        Size {
            width: self.right.saturating_sub(self.left).max(0) as u32,
            height: self.bottom.saturating_sub(self.top).max(0) as u32,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

/// Where to capture from within a window.
///
/// `capture_size` never exceeds `outer_size`. Without shadow trimming it equals
/// `outer_size` and `capture_offset` is (0, 0). The all-zero value means the
/// window is gone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowGeometry {
    /// Full window rectangle size, shadow included
    pub outer_size: Size,
    /// Size of the region that ends up in the frame buffer
    pub capture_size: Size,
    /// Top-left of the capture region relative to the outer rectangle
    pub capture_offset: Point,
}

impl WindowGeometry {
    pub const ZERO: WindowGeometry = WindowGeometry {
        outer_size: Size::ZERO,
        capture_size: Size::ZERO,
        capture_offset: Point { x: 0, y: 0 },
    };

    /// Geometry for an untrimmed capture of `outer`.
    pub fn untrimmed(outer: Size) -> Self {
        Self {
            outer_size: outer,
            capture_size: outer,
            capture_offset: Point::default(),
        }
    }

    /// Geometry for capturing the `frame` sub-rectangle of `outer`.
    pub fn trimmed(outer: Rect, frame: Rect) -> Self {
        let outer_size = outer.size();
        Self {
            outer_size,
            capture_size: frame.size().min(outer_size),
            capture_offset: Point::new(frame.left - outer.left, frame.top - outer.top),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.capture_size.is_empty()
    }
}

/// Reads the window's current geometry.
///
/// An invalid handle, or a window whose rectangle can no longer be read, gives
/// `WindowGeometry::ZERO`. If the extended frame bounds are unavailable the whole
/// window is captured.
pub fn compute_geometry<P: PlatformCapture + ?Sized>(
    platform: &P,
    window: WindowHandle,
    trim_shadow: bool,
) -> WindowGeometry {
    if !platform.is_window(window) {
        return WindowGeometry::ZERO;
    }

    let outer = match platform.window_rect(window) {
        Ok(rect) => rect,
        Err(e) => {
            tracing::debug!("Window rect unavailable for {:?}: {}", window, e);
            return WindowGeometry::ZERO;
        }
    };

    if !trim_shadow {
        return WindowGeometry::untrimmed(outer.size());
    }

    match platform.extended_frame_bounds(window) {
        Ok(frame) => WindowGeometry::trimmed(outer, frame),
        Err(e) => {
            tracing::debug!(
                "Extended frame bounds unavailable for {:?}, capturing full window: {}",
                window,
                e
            );
            WindowGeometry::untrimmed(outer.size())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakePlatform, FakeWindow};

    #[test]
    fn test_untrimmed_geometry_matches_outer() {
        let platform = FakePlatform::new();
        let hwnd = platform.add_window(
            FakeWindow::new("Editor", Rect::new(100, 50, 900, 650))
                .with_frame(Rect::new(107, 50, 893, 643)),
        );

        let geometry = compute_geometry(&platform, hwnd, false);
        assert_eq!(geometry.outer_size, Size::new(800, 600));
        assert_eq!(geometry.capture_size, Size::new(800, 600));
        assert_eq!(geometry.capture_offset, Point::new(0, 0));
    }

    #[test]
    fn test_trimmed_geometry_uses_frame_bounds() {
        let platform = FakePlatform::new();
        let hwnd = platform.add_window(
            FakeWindow::new("Editor", Rect::new(100, 50, 900, 650))
                .with_frame(Rect::new(107, 50, 893, 643)),
        );

        let geometry = compute_geometry(&platform, hwnd, true);
        assert_eq!(geometry.outer_size, Size::new(800, 600));
        assert_eq!(geometry.capture_size, Size::new(786, 593));
        assert_eq!(geometry.capture_offset, Point::new(7, 0));
    }

    #[test]
    fn test_trimmed_capture_never_exceeds_outer() {
        let platform = FakePlatform::new();
        // Frame bounds larger than and left of the outer rect
        let hwnd = platform.add_window(
            FakeWindow::new("Odd", Rect::new(0, 0, 300, 200))
                .with_frame(Rect::new(-10, -5, 320, 230)),
        );

        let geometry = compute_geometry(&platform, hwnd, true);
        assert_eq!(geometry.capture_size, Size::new(300, 200));
        assert_eq!(geometry.capture_offset, Point::new(-10, -5));
    }

    #[test]
    fn test_missing_frame_bounds_falls_back_to_outer() {
        let platform = FakePlatform::new();
        let hwnd = platform.add_window(FakeWindow::new("No DWM", Rect::new(0, 0, 640, 480)));

        let geometry = compute_geometry(&platform, hwnd, true);
        assert_eq!(geometry, WindowGeometry::untrimmed(Size::new(640, 480)));
    }

    #[test]
    fn test_closed_window_gives_zero_geometry() {
        let platform = FakePlatform::new();
        let hwnd = platform.add_window(FakeWindow::new("Gone", Rect::new(0, 0, 640, 480)));
        platform.close_window(hwnd);

        assert_eq!(compute_geometry(&platform, hwnd, false), WindowGeometry::ZERO);
        assert_eq!(compute_geometry(&platform, hwnd, true), WindowGeometry::ZERO);
    }

    #[test]
    fn test_inverted_rect_is_empty() {
        assert!(Rect::new(10, 10, 5, 5).size().is_empty());
        assert_eq!(Size::new(800, 600).byte_len(), 1_920_000);
    }
}
