use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};

pub const MAX_DIMENSION: u32 = 2048;
pub const JPEG_QUALITY: u8 = 95;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Failed to decode image: {0}")]
    Decode(ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(ImageError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Decodes `data`, converts it to RGB, shrinks it to fit within
/// 2048x2048 and writes it to `dest` as a quality-95 JPEG.
pub fn normalize_to_jpeg(data: &[u8], dest: &Path) -> Result<(), NormalizeError> {
    let decoded = image::load_from_memory(data).map_err(NormalizeError::Decode)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let rgb = fit_within(rgb, MAX_DIMENSION);

    let file = File::create(dest).map_err(|source| NormalizeError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    rgb.write_with_encoder(encoder).map_err(NormalizeError::Encode)?;
    writer.flush().map_err(|source| NormalizeError::Io {
        path: dest.display().to_string(),
        source,
    })
}

/// Aspect-preserving downscale; images already within bounds are untouched.
fn fit_within(image: DynamicImage, max: u32) -> DynamicImage {
    if image.width() <= max && image.height() <= max {
        return image;
    }
    image.thumbnail(max, max)
}
