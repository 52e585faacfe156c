//! Image resources that receive captured frames.
//!
//! A session never hands out its frame buffer. Each cycle it pushes the buffer's
//! bytes into a [`TextureSink`] created by the caller's [`TextureAllocator`];
//! consumers read from that sink on their own threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Channel layout of published pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, blue first
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
        }
    }
}

/// One full-texture pixel upload.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpdate<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows
    pub row_pitch: usize,
    pub format: PixelFormat,
    /// Always 0; captured textures have no mip chain
    pub mip_level: u32,
    /// `row_pitch * height` bytes, top row first
    pub data: &'a [u8],
}

/// Consumer-side image resource.
pub trait TextureSink: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Replaces the texture contents. Called from the capture worker thread.
    fn update(&self, update: &TextureUpdate<'_>);
}

impl<T: TextureSink + ?Sized> TextureSink for Arc<T> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn update(&self, update: &TextureUpdate<'_>) {
        (**self).update(update)
    }
}

/// Creates the texture a frame buffer publishes into.
pub trait TextureAllocator: Send + Sync + 'static {
    type Texture: TextureSink + Clone + 'static;

    fn create_texture(&self, width: u32, height: u32) -> Self::Texture;
}

/// A BGRA8 image in shared memory, readable from any thread.
pub struct SharedTexture {
    width: u32,
    height: u32,
    pixels: RwLock<Vec<u8>>,
    version: AtomicU64,
}

impl SharedTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: RwLock::new(vec![0; width as usize * height as usize * 4]),
            version: AtomicU64::new(0),
        }
    }

    /// Number of updates received so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Runs `f` with the current BGRA8 contents (tightly packed, top row first).
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let pixels = self.pixels.read().unwrap_or_else(|e| e.into_inner());
        f(&pixels)
    }

    /// Copy of the current BGRA8 contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_pixels(|p| p.to_vec())
    }
}

impl TextureSink for SharedTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn update(&self, update: &TextureUpdate<'_>) {
        if update.width != self.width || update.height != self.height || update.mip_level != 0 {
            tracing::warn!(
                "Ignoring {}x{} update for {}x{} texture",
                update.width,
                update.height,
                self.width,
                self.height
            );
            return;
        }

        let row_len = self.width as usize * update.format.bytes_per_pixel();
        if row_len == 0 {
            return;
        }
        let mut pixels = self.pixels.write().unwrap_or_else(|e| e.into_inner());
        for (y, row) in pixels.chunks_exact_mut(row_len).enumerate() {
            let start = y * update.row_pitch;
            match update.data.get(start..start + row_len) {
                Some(src) => row.copy_from_slice(src),
                None => break,
            }
        }
        drop(pixels);
        self.version.fetch_add(1, Ordering::Release);
    }
}

/// Allocates [`SharedTexture`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SharedTextureAllocator;

impl TextureAllocator for SharedTextureAllocator {
    type Texture = Arc<SharedTexture>;

    fn create_texture(&self, width: u32, height: u32) -> Arc<SharedTexture> {
        Arc::new(SharedTexture::new(width, height))
    }
}
