//! PNG encoding of frame and light buffers.
//!
//! Buffers are stored bottom row first; images are written top row first, so
//! every writer flips vertically. Values are clamped to [0, 1] and encoded
//! with a 1/2.2 gamma.

use std::fs;
use std::path::{Path, PathBuf};

use hypox_math::Vec3;
use thiserror::Error;

use crate::framebuffer::FrameBuffer;
use crate::light::Light;

/// Display gamma applied when encoding.
pub const OUTPUT_GAMMA: f32 = 2.2;

/// Errors raised while writing images.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Buffer holds {len} values, expected {width}x{height}")]
    SizeMismatch { len: usize, width: u32, height: u32 },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Encode one linear channel value as a gamma-corrected byte.
#[inline]
pub fn encode_channel(linear: f32) -> u8 {
    let v = if linear.is_nan() { 0.0 } else { linear.clamp(0.0, 1.0) };
    (255.0 * v.powf(1.0 / OUTPUT_GAMMA)).ceil() as u8
}

fn check_size(len: usize, width: u32, height: u32) -> ImageResult<()> {
    if len != width as usize * height as usize {
        return Err(ImageError::SizeMismatch { len, width, height });
    }
    Ok(())
}

fn saved(result: image::ImageResult<()>, path: &Path) -> ImageResult<()> {
    result.map_err(|source| ImageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Write an RGB buffer as an 8-bit PNG.
pub fn write_color_image(path: impl AsRef<Path>, width: u32, height: u32, pixels: &[Vec3]) -> ImageResult<()> {
    check_size(pixels.len(), width, height)?;
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        let c = pixels[((height - 1 - y) * width + x) as usize];
        image::Rgb([encode_channel(c.x), encode_channel(c.y), encode_channel(c.z)])
    });
    let path = path.as_ref();
    saved(image.save(path), path)
}

/// Write a scalar buffer as an 8-bit grayscale PNG.
pub fn write_scalar_image(path: impl AsRef<Path>, width: u32, height: u32, values: &[f32]) -> ImageResult<()> {
    check_size(values.len(), width, height)?;
    let image = image::GrayImage::from_fn(width, height, |x, y| {
        image::Luma([encode_channel(values[((height - 1 - y) * width + x) as usize])])
    });
    let path = path.as_ref();
    saved(image.save(path), path)
}

fn ensure_dir(dir: &Path) -> ImageResult<()> {
    fs::create_dir_all(dir).map_err(|source| ImageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `color.png`, `depth.png` and `normal.png` into `dir`.
pub fn write_frame(dir: impl AsRef<Path>, frame: &FrameBuffer) -> ImageResult<()> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;
    let (width, height) = (frame.width(), frame.height());

    write_color_image(dir.join("color.png"), width, height, &frame.color)?;
    write_scalar_image(dir.join("depth.png"), width, height, &frame.depth_image())?;
    write_color_image(dir.join("normal.png"), width, height, &frame.normal_image())?;

    log::info!("Wrote {}x{} images to {}", width, height, dir.display());
    Ok(())
}

/// Dump a light's shadow maps and RSM buffers into `dir`.
///
/// Point lights produce `light{index}_face{f}_depth.png` per cube face; area
/// lights produce `light{index}_rsm_{pos,norm,flux}.png`. Lights without
/// visibility data write nothing.
pub fn write_light_debug(dir: impl AsRef<Path>, index: usize, light: &Light) -> ImageResult<()> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    match light {
        Light::Point(point) => {
            for (face, map) in point.faces().iter().enumerate() {
                write_scalar_image(
                    dir.join(format!("light{index}_face{face}_depth.png")),
                    map.width(),
                    map.height(),
                    &map.depth_image(),
                )?;
            }
        }
        Light::Area(area) => {
            if let Some(rsm) = area.rsm() {
                let images = rsm.debug_images();
                let (width, height) = (rsm.width(), rsm.height());
                write_color_image(dir.join(format!("light{index}_rsm_pos.png")), width, height, &images.position)?;
                write_color_image(dir.join(format!("light{index}_rsm_norm.png")), width, height, &images.normal)?;
                write_scalar_image(dir.join(format!("light{index}_rsm_flux.png")), width, height, &images.flux)?;
            }
        }
    }
    Ok(())
}
