//! PNG snapshots of a live texture.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::{ImageBuffer, Rgba};
use std::path::{Path, PathBuf};

use crate::texture::{SharedTexture, TextureSink};

/// Converts tightly packed BGRA8 pixels to an RGBA image.
pub fn bgra_to_rgba_image(
    width: u32,
    height: u32,
    bgra: &[u8],
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    let expected = width as usize * height as usize * 4;
    if bgra.len() != expected {
        return Err(anyhow!(
            "Expected {} bytes for {}x{} BGRA image, got {}",
            expected,
            width,
            height,
            bgra.len()
        ));
    }

    let rgba: Vec<u8> = bgra
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect();
    ImageBuffer::from_raw(width, height, rgba).ok_or_else(|| anyhow!("Image buffer size mismatch"))
}

/// Copies the texture's current contents into an RGBA image.
pub fn texture_to_image(texture: &SharedTexture) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    texture.with_pixels(|bgra| bgra_to_rgba_image(texture.width(), texture.height(), bgra))
}

/// Saves the texture as `capture_YYYYMMDD_HHMMSS.png` in `dir`.
///
/// Returns the path to the saved file.
pub fn save_snapshot(texture: &SharedTexture, dir: &Path) -> Result<PathBuf> {
    let img = texture_to_image(texture)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("capture_{}.png", timestamp));

    img.save(&path)
        .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
    tracing::info!("Saved {}x{} snapshot to {}", img.width(), img.height(), path.display());
    Ok(path)
}
