use std::io::Cursor;

use image::ImageReader;

use super::{MAX_FILE_SIZE, UploadedFile};

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub const NO_FILE: &str = "No file provided";
pub const TOO_LARGE: &str = "File exceeds 30MB limit";
pub const BAD_EXTENSION: &str = "Invalid file extension";
pub const CORRUPTED: &str = "Invalid or corrupted image file";

/// Returns every problem found with the upload; empty means it may proceed.
///
/// Inspection reads through its own cursor, so `file.data` is never consumed.
pub fn validate(file: Option<&UploadedFile>) -> Vec<String> {
    let file = match file {
        Some(file) if !file.filename.is_empty() && !file.data.is_empty() => file,
        _ => return vec![NO_FILE.to_string()],
    };

    let mut errors = Vec::new();

    if file.size() > MAX_FILE_SIZE {
        errors.push(TOO_LARGE.to_string());
    }

    if !has_allowed_extension(file) {
        errors.push(BAD_EXTENSION.to_string());
    }

    if !looks_like_image(&file.data) {
        errors.push(CORRUPTED.to_string());
    }

    errors
}

fn has_allowed_extension(file: &UploadedFile) -> bool {
    file.extension()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Header-level integrity check: the format is recognised and the
/// dimensions can be read, without decoding pixel data.
fn looks_like_image(data: &[u8]) -> bool {
    let reader = match ImageReader::new(Cursor::new(data)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return false,
    };
    if reader.format().is_none() {
        return false;
    }
    matches!(reader.into_dimensions(), Ok((w, h)) if w > 0 && h > 0)
}
