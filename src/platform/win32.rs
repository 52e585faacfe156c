//! Win32 implementation: EnumWindows for discovery, DWM for the shadow-free
//! frame bounds, GDI DIB sections as drawing surfaces and PrintWindow/BitBlt to
//! fill them.

use std::ffi::{c_void, OsString};
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, FALSE, HANDLE, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_EXTENDED_FRAME_BOUNDS};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject,
    GdiFlush, GetDC, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindow,
};

use super::{DrawingSurface, Enumeration, PlatformCapture, WindowHandle};
use crate::capture::region::{Point, Rect, Size};
use crate::error::{CaptureError, Result};

/// Renders windows that draw through DirectComposition as well.
const PW_RENDERFULLCONTENT: PRINT_WINDOW_FLAGS = PRINT_WINDOW_FLAGS(2);

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn os_error(call: &'static str) -> impl FnOnce(windows::core::Error) -> CaptureError {
    move |e| CaptureError::platform(call, e.to_string())
}

impl From<RECT> for Rect {
    fn from(r: RECT) -> Self {
        Rect::new(r.left, r.top, r.right, r.bottom)
    }
}

/// GDI and DWM backed capture.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32Platform;

/// A memory DC with a bitmap selected into it.
///
/// For pixel surfaces the bitmap is a top-down 32bpp DIB section and `bits`
/// points at its storage; scratch surfaces use a device-compatible bitmap with
/// no CPU-visible storage.
pub struct GdiSurface {
    dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
    bits: *mut u8,
    size: Size,
}

// SAFETY: the DC and bitmap are only touched by whichever thread currently owns
// the surface; GDI memory DCs are not bound to the creating thread.
unsafe impl Send for GdiSurface {}

impl GdiSurface {
    fn bind(dc: HDC, bitmap: HBITMAP, bits: *mut u8, size: Size) -> Self {
        let previous = unsafe { SelectObject(dc, HGDIOBJ(bitmap.0)) };
        Self {
            dc,
            bitmap,
            previous,
            bits,
            size,
        }
    }
}

impl DrawingSurface for GdiSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn pixels(&self) -> Option<&[u8]> {
        if self.bits.is_null() {
            return None;
        }
        // SAFETY: a top-down 32bpp DIB with a width of whole pixels has no row
        // padding, so its storage is exactly width * height * 4 bytes and lives
        // until the bitmap is deleted in `release`.
        Some(unsafe { std::slice::from_raw_parts(self.bits, self.size.byte_len()) })
    }

    fn release(&mut self) {
        if self.dc.is_invalid() {
            return;
        }
        unsafe {
            SelectObject(self.dc, self.previous);
            let _ = DeleteObject(HGDIOBJ(self.bitmap.0));
            let _ = DeleteDC(self.dc);
        }
        self.dc = HDC::default();
        self.bitmap = HBITMAP::default();
        self.previous = HGDIOBJ::default();
        self.bits = std::ptr::null_mut();
    }
}

impl Drop for GdiSurface {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a memory DC compatible with the window's own DC.
fn memory_dc_for(window: HWND) -> Result<HDC> {
    unsafe {
        let window_dc = GetDC(window);
        let dc = CreateCompatibleDC(window_dc);
        ReleaseDC(window, window_dc);
        if dc.is_invalid() {
            return Err(CaptureError::platform(
                "CreateCompatibleDC",
                "no device context",
            ));
        }
        Ok(dc)
    }
}

impl PlatformCapture for Win32Platform {
    type Surface = GdiSurface;

    fn enumerate_windows(&self, visit: &mut dyn FnMut(WindowHandle) -> Enumeration) {
        struct EnumState<'a> {
            visit: &'a mut dyn FnMut(WindowHandle) -> Enumeration,
        }

        unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
            unsafe {
                let state = &mut *(lparam.0 as *mut EnumState<'_>);
                match (state.visit)(WindowHandle(hwnd.0 as usize)) {
                    Enumeration::Continue => TRUE,
                    Enumeration::Stop => FALSE,
                }
            }
        }

        let mut state = EnumState { visit };
        unsafe {
            // EnumWindows reports an error when the callback stops it early,
            // which is expected here
            let _ = EnumWindows(Some(enum_callback), LPARAM(&mut state as *mut _ as isize));
        }
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        let hwnd = hwnd(window);
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return None;
            }
            let mut buf: Vec<u16> = vec![0; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buf);
            if copied <= 0 {
                return None;
            }
            Some(
                OsString::from_wide(&buf[..copied as usize])
                    .to_string_lossy()
                    .into_owned(),
            )
        }
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(hwnd(window)).as_bool() }
    }

    fn window_rect(&self, window: WindowHandle) -> Result<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd(window), &mut rect) }.map_err(os_error("GetWindowRect"))?;
        Ok(rect.into())
    }

    fn extended_frame_bounds(&self, window: WindowHandle) -> Result<Rect> {
        let mut rect = RECT::default();
        unsafe {
            DwmGetWindowAttribute(
                hwnd(window),
                DWMWA_EXTENDED_FRAME_BOUNDS,
                &mut rect as *mut RECT as *mut c_void,
                std::mem::size_of::<RECT>() as u32,
            )
        }
        .map_err(os_error("DwmGetWindowAttribute"))?;
        Ok(rect.into())
    }

    fn create_pixel_surface(&self, window: WindowHandle, size: Size) -> Result<GdiSurface> {
        let dc = memory_dc_for(hwnd(window))?;

        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: size.width as i32,
                // Negative height: rows are stored top to bottom
                biHeight: -(size.height as i32),
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut bits: *mut c_void = std::ptr::null_mut();
        let bitmap = unsafe {
            CreateDIBSection(dc, &info, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
        };
        let bitmap = match bitmap {
            Ok(bitmap) if !bits.is_null() => bitmap,
            Ok(bitmap) => {
                unsafe {
                    let _ = DeleteObject(HGDIOBJ(bitmap.0));
                    let _ = DeleteDC(dc);
                }
                return Err(CaptureError::platform(
                    "CreateDIBSection",
                    "no pixel storage returned",
                ));
            }
            Err(e) => {
                unsafe {
                    let _ = DeleteDC(dc);
                }
                return Err(os_error("CreateDIBSection")(e));
            }
        };

        Ok(GdiSurface::bind(dc, bitmap, bits as *mut u8, size))
    }

    fn create_scratch_surface(&self, window: WindowHandle, size: Size) -> Result<GdiSurface> {
        let hwnd = hwnd(window);
        let dc = memory_dc_for(hwnd)?;

        let bitmap = unsafe {
            let window_dc = GetDC(hwnd);
            let bitmap = CreateCompatibleBitmap(window_dc, size.width as i32, size.height as i32);
            ReleaseDC(hwnd, window_dc);
            bitmap
        };
        if bitmap.is_invalid() {
            unsafe {
                let _ = DeleteDC(dc);
            }
            return Err(CaptureError::platform(
                "CreateCompatibleBitmap",
                "no bitmap returned",
            ));
        }

        Ok(GdiSurface::bind(dc, bitmap, std::ptr::null_mut(), size))
    }

    fn paint_window(&self, window: WindowHandle, target: &mut GdiSurface) -> Result<()> {
        let painted = unsafe { PrintWindow(hwnd(window), target.dc, PW_RENDERFULLCONTENT) };
        if !painted.as_bool() {
            return Err(CaptureError::platform("PrintWindow", "window did not paint"));
        }
        // DIB storage is only coherent once batched GDI calls have run
        unsafe {
            let _ = GdiFlush();
        }
        Ok(())
    }

    fn blit(
        &self,
        source: &GdiSurface,
        source_origin: Point,
        size: Size,
        target: &mut GdiSurface,
    ) -> Result<()> {
        unsafe {
            BitBlt(
                target.dc,
                0,
                0,
                size.width as i32,
                size.height as i32,
                source.dc,
                source_origin.x,
                source_origin.y,
                SRCCOPY,
            )
            .map_err(os_error("BitBlt"))?;
            let _ = GdiFlush();
        }
        Ok(())
    }
}
