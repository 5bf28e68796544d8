use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Contrast multiplier applied when no options are given.
pub const DEFAULT_CONTRAST: f32 = 2.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceOptions {
    /// 1.0 leaves contrast untouched, 0.0 flattens the image to its mean gray.
    pub contrast: f32,
    /// Down-scale so neither side exceeds this many pixels. `None` keeps the size.
    pub max_dimension: Option<u32>,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self { contrast: DEFAULT_CONTRAST, max_dimension: None }
    }
}

/// Grayscale + contrast x2 on raw image bytes (JPEG / PNG / WEBP / …), returned as PNG.
///
/// Unreadable or corrupt input is an error: it must not reach OCR.
pub fn enhance(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    enhance_with(data, &EnhanceOptions::default())
}

pub fn enhance_with(data: &[u8], opts: &EnhanceOptions) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    tracing::debug!(width = img.width(), height = img.height(), "Enhancing receipt image");
    encode_as_png(normalize(img, opts))
}

fn normalize(img: DynamicImage, opts: &EnhanceOptions) -> DynamicImage {
    let img = match opts.max_dimension {
        Some(max) if img.width() > max || img.height() > max => {
            img.resize(max, max, image::imageops::FilterType::Lanczos3)
        }
        _ => img,
    };

    DynamicImage::ImageLuma8(adjust_contrast(&grayscale(&img), opts.contrast))
}

/// ITU-R 601-2 luma (`0.299 R + 0.587 G + 0.114 B`) in 16-bit fixed point.
/// Alpha is dropped.
fn grayscale(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// Scale every pixel's distance from the image's mean luminance by `factor`.
fn adjust_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let pixels = u64::from(gray.width()) * u64::from(gray.height());
    if pixels == 0 {
        return gray.clone();
    }
    let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f64 / pixels as f64).round() as f32;

    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = f32::from(gray.get_pixel(x, y)[0]);
        let v = mean + factor * (p - mean);
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
