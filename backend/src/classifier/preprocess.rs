use std::path::Path;

use image::ImageReader;
use image::imageops::FilterType;
use ndarray::Array4;

use super::InferenceError;

pub const INPUT_SIZE: u32 = 224;
const MEAN: [f32; 3] = [0.5, 0.5, 0.5];
const STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Loads the image at `path` into a `[1, 3, 224, 224]` normalised tensor.
/// The decoder is picked from the file content, not its extension.
pub fn preprocess(path: &Path) -> Result<Array4<f32>, InferenceError> {
    let failed = |e: &dyn std::fmt::Display| {
        InferenceError::Preprocessing(format!("{}: {}", path.display(), e))
    };
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| failed(&e))?
        .decode()
        .map_err(|e| failed(&e))?;
    Ok(to_tensor(&image))
}

pub fn to_tensor(image: &image::DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            tensor[[0, channel, y as usize, x as usize]] = (value - MEAN[channel]) / STD[channel];
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    #[test]
    fn output_is_nchw_at_model_resolution() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = to_tensor(&image);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn channels_are_normalised_to_unit_range() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 0, 255])));
        let tensor = to_tensor(&image);
        assert!((tensor[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 10, 10]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 223, 223]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decoder_follows_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabelled.png");
        DynamicImage::ImageRgb8(RgbImage::new(40, 30))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();
        let tensor = preprocess(&path).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn missing_file_is_a_preprocessing_error() {
        let err = preprocess(Path::new("/nonexistent/realcheck/input.jpg")).unwrap_err();
        assert!(matches!(err, InferenceError::Preprocessing(_)));
    }
}
