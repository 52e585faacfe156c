//! Frame buffer: the pixel-bound drawing surface, the optional scratch surface
//! used for shadow trimming, and the texture the pixels are published to.

use crate::capture::region::{Size, WindowGeometry};
use crate::error::{CaptureError, Result};
use crate::platform::{DrawingSurface, PlatformCapture, WindowHandle};
use crate::texture::{PixelFormat, TextureAllocator, TextureSink, TextureUpdate};

pub struct FrameBuffer<S: DrawingSurface, T> {
    size: Size,
    /// Receives the final image; its storage is what gets published
    primary: S,
    /// Whole-window intermediate target, present only when trimming
    scratch: Option<S>,
    texture: T,
    released: bool,
}

impl<S: DrawingSurface, T: TextureSink + Clone> FrameBuffer<S, T> {
    /// Allocates a buffer for `geometry.capture_size`.
    ///
    /// Returns `Ok(None)` when either dimension is zero: there is nothing to
    /// show. With `trim_shadow` a scratch surface of `geometry.outer_size` is
    /// created as well.
    pub fn allocate<P, A>(
        platform: &P,
        window: WindowHandle,
        geometry: &WindowGeometry,
        trim_shadow: bool,
        textures: &A,
    ) -> Result<Option<Self>>
    where
        P: PlatformCapture<Surface = S> + ?Sized,
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        let size = geometry.capture_size;
        if size.is_empty() {
            return Ok(None);
        }

        let primary = platform.create_pixel_surface(window, size)?;
        let storage_len = primary.pixels().map(<[u8]>::len);
        if storage_len != Some(size.byte_len()) {
            return Err(CaptureError::platform(
                "create_pixel_surface",
                format!(
                    "expected {} bytes of storage for {}x{}, got {:?}",
                    size.byte_len(),
                    size.width,
                    size.height,
                    storage_len
                ),
            ));
        }

        let scratch = if trim_shadow {
            Some(platform.create_scratch_surface(window, geometry.outer_size)?)
        } else {
            None
        };

        let texture = textures.create_texture(size.width, size.height);
        tracing::debug!(
            "Allocated {}x{} frame buffer (scratch: {:?})",
            size.width,
            size.height,
            scratch.as_ref().map(|s| s.size())
        );

        Ok(Some(Self {
            size,
            primary,
            scratch,
            texture,
            released: false,
        }))
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Size of the scratch surface, `None` when not trimming.
    pub fn scratch_size(&self) -> Option<Size> {
        self.scratch.as_ref().map(|s| s.size())
    }

    /// Recreates the scratch surface for a new outer size, keeping the primary
    /// surface and texture.
    ///
    /// The old scratch surface stays in place if the new one cannot be created.
    pub fn resize_scratch<P>(&mut self, platform: &P, window: WindowHandle, outer: Size) -> Result<()>
    where
        P: PlatformCapture<Surface = S> + ?Sized,
    {
        let replacement = platform.create_scratch_surface(window, outer)?;
        if let Some(mut old) = self.scratch.replace(replacement) {
            old.release();
        }
        Ok(())
    }

    /// Paints the window into the primary surface, going through the scratch
    /// surface and a blit of the trimmed region when trimming.
    pub fn pull<P>(&mut self, platform: &P, window: WindowHandle, geometry: &WindowGeometry) -> Result<()>
    where
        P: PlatformCapture<Surface = S> + ?Sized,
    {
        match self.scratch.as_mut() {
            Some(scratch) => {
                platform.paint_window(window, scratch)?;
                platform.blit(scratch, geometry.capture_offset, self.size, &mut self.primary)
            }
            None => platform.paint_window(window, &mut self.primary),
        }
    }

    /// Pushes the primary storage to the texture. Returns false if there was
    /// nothing to publish.
    pub fn publish(&self) -> bool {
        let Some(data) = self.primary.pixels() else {
            return false;
        };
        self.texture.update(&TextureUpdate {
            width: self.size.width,
            height: self.size.height,
            row_pitch: self.size.width as usize * PixelFormat::Bgra8.bytes_per_pixel(),
            format: PixelFormat::Bgra8,
            mip_level: 0,
            data,
        });
        true
    }

    /// Destroys both surfaces. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        if let Some(scratch) = self.scratch.as_mut() {
            scratch.release();
        }
        self.primary.release();
        self.released = true;
    }
}

impl<S: DrawingSurface, T> Drop for FrameBuffer<S, T> {
    fn drop(&mut self) {
        if !self.released {
            if let Some(scratch) = self.scratch.as_mut() {
                scratch.release();
            }
            self.primary.release();
        }
    }
}
