//! Scripted in-memory platform for tests.
//!
//! Windows are plain records that tests can add, resize and close while a
//! session is running. Painting writes a position pattern so blits can be
//! checked: pixel (x, y) of a window becomes `[x, y, tag, 255]` (low bytes).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DrawingSurface, Enumeration, PlatformCapture, WindowHandle};
use crate::capture::region::{Point, Rect, Size};
use crate::error::{CaptureError, Result};

#[derive(Clone, Debug)]
pub struct FakeWindow {
    pub title: String,
    pub rect: Rect,
    pub frame: Option<Rect>,
    pub tag: u8,
    pub alive: bool,
}

impl FakeWindow {
    pub fn new(title: &str, rect: Rect) -> Self {
        Self {
            title: title.to_string(),
            rect,
            frame: None,
            tag: 0,
            alive: true,
        }
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }
}

#[derive(Default)]
struct FakeState {
    windows: Vec<FakeWindow>,
    visited: usize,
    paints: usize,
    blits: usize,
    fail_paint: bool,
    fail_pixel_surface: bool,
    fail_scratch_surface: bool,
    failed_surfaces: usize,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
    live_surfaces: Arc<AtomicUsize>,
    created_surfaces: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Adds a window at the end of the enumeration order.
    pub fn add_window(&self, window: FakeWindow) -> WindowHandle {
        let mut state = self.state();
        state.windows.push(window);
        // Handle values start at 1 so they never look like a null HWND
        WindowHandle(state.windows.len())
    }

    pub fn close_window(&self, window: WindowHandle) {
        if let Some(w) = self.state().windows.get_mut(window.0 - 1) {
            w.alive = false;
        }
    }

    pub fn resize_window(&self, window: WindowHandle, rect: Rect, frame: Option<Rect>) {
        if let Some(w) = self.state().windows.get_mut(window.0 - 1) {
            w.rect = rect;
            w.frame = frame;
        }
    }

    pub fn set_fail_paint(&self, fail: bool) {
        self.state().fail_paint = fail;
    }

    pub fn set_fail_pixel_surface(&self, fail: bool) {
        self.state().fail_pixel_surface = fail;
    }

    pub fn set_fail_scratch_surface(&self, fail: bool) {
        self.state().fail_scratch_surface = fail;
    }

    /// Surface creations refused because of a scripted failure.
    pub fn failed_surfaces(&self) -> usize {
        self.state().failed_surfaces
    }

    /// Number of windows visited by enumeration so far.
    pub fn visited(&self) -> usize {
        self.state().visited
    }

    pub fn paints(&self) -> usize {
        self.state().paints
    }

    pub fn blits(&self) -> usize {
        self.state().blits
    }

    /// Surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces.load(Ordering::SeqCst)
    }

    pub fn created_surfaces(&self) -> usize {
        self.created_surfaces.load(Ordering::SeqCst)
    }

    fn window(&self, window: WindowHandle) -> Option<FakeWindow> {
        let state = self.state();
        window
            .0
            .checked_sub(1)
            .and_then(|i| state.windows.get(i))
            .filter(|w| w.alive)
            .cloned()
    }

    fn surface(&self, size: Size, cpu_visible: bool) -> FakeSurface {
        self.live_surfaces.fetch_add(1, Ordering::SeqCst);
        self.created_surfaces.fetch_add(1, Ordering::SeqCst);
        FakeSurface {
            size,
            data: vec![0; size.byte_len()],
            cpu_visible,
            live: Some(self.live_surfaces.clone()),
        }
    }
}

pub struct FakeSurface {
    size: Size,
    data: Vec<u8>,
    cpu_visible: bool,
    live: Option<Arc<AtomicUsize>>,
}

impl FakeSurface {
    fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        self.data.get_mut(i..i + 4)
    }

    fn pixel(&self, x: i32, y: i32) -> Option<&[u8]> {
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return None;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        self.data.get(i..i + 4)
    }
}

impl DrawingSurface for FakeSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn pixels(&self) -> Option<&[u8]> {
        if self.cpu_visible && self.live.is_some() {
            Some(&self.data)
        } else {
            None
        }
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            live.fetch_sub(1, Ordering::SeqCst);
            self.data = Vec::new();
        }
    }
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.release();
    }
}

impl PlatformCapture for FakePlatform {
    type Surface = FakeSurface;

    fn enumerate_windows(&self, visit: &mut dyn FnMut(WindowHandle) -> Enumeration) {
        let count = self.state().windows.len();
        for i in 0..count {
            self.state().visited += 1;
            if visit(WindowHandle(i + 1)) == Enumeration::Stop {
                return;
            }
        }
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        self.window(window).map(|w| w.title)
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.window(window).is_some()
    }

    fn window_rect(&self, window: WindowHandle) -> Result<Rect> {
        self.window(window)
            .map(|w| w.rect)
            .ok_or_else(|| CaptureError::platform("GetWindowRect", "invalid window"))
    }

    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<Rect> {
        self.window(window)
            .and_then(|w| w.frame)
            .ok_or_else(|| CaptureError::platform("DwmGetWindowAttribute", "no frame bounds"))
    }

    fn create_pixel_surface(&self, _window: WindowHandle, size: Size) -> Result<FakeSurface> {
        {
            let mut state = self.state();
            if state.fail_pixel_surface {
                state.failed_surfaces += 1;
                return Err(CaptureError::platform("CreateDIBSection", "scripted failure"));
            }
        }
        Ok(self.surface(size, true))
    }

    fn create_scratch_surface(&self, _window: WindowHandle, size: Size) -> Result<FakeSurface> {
        {
            let mut state = self.state();
            if state.fail_scratch_surface {
                state.failed_surfaces += 1;
                return Err(CaptureError::platform("CreateCompatibleBitmap", "scripted failure"));
            }
        }
        Ok(self.surface(size, false))
    }

    fn paint_window(&self, window: WindowHandle, target: &mut FakeSurface) -> Result<()> {
        let w = self
            .window(window)
            .ok_or_else(|| CaptureError::platform("PrintWindow", "invalid window"))?;
        {
            let mut state = self.state();
            if state.fail_paint {
                return Err(CaptureError::platform("PrintWindow", "scripted failure"));
            }
            state.paints += 1;
        }

        let size = w.rect.size();
        for y in 0..size.height {
            for x in 0..size.width {
                if let Some(px) = target.pixel_mut(x, y) {
                    px.copy_from_slice(&[x as u8, y as u8, w.tag, 255]);
                }
            }
        }
        Ok(())
    }

    fn blit(
        &self,
        source: &FakeSurface,
        source_origin: Point,
        size: Size,
        target: &mut FakeSurface,
    ) -> Result<()> {
        self.state().blits += 1;
        for y in 0..size.height {
            for x in 0..size.width {
                let src = source
                    .pixel(source_origin.x + x as i32, source_origin.y + y as i32)
                    .map(|p| [p[0], p[1], p[2], p[3]]);
                if let (Some(src), Some(dst)) = (src, target.pixel_mut(x, y)) {
                    dst.copy_from_slice(&src);
                }
            }
        }
        Ok(())
    }
}
