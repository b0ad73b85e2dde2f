//! Image validation for thumbnails before they are re-hosted.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

/// Allowed thumbnail formats.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Maximum file size for images (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Validate image data: check size and format, and detect the content type.
///
/// Returns the content type on success (e.g., "image/jpeg").
pub fn validate_image(data: &[u8]) -> Result<String, String> {
    if data.is_empty() {
        return Err("Image is empty".to_string());
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(format!(
            "Image too large: {} bytes (max {})",
            data.len(),
            MAX_FILE_SIZE
        ));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader
        .format()
        .ok_or_else(|| "Could not detect image format".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
            format
        ));
    }

    Ok(format.to_mime_type().to_string())
}

/// File extension for a validated content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A tiny, fully encoded image in the given format.
    pub(crate) fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(2, 2, ::image::Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detects_png_and_jpeg() {
        assert_eq!(validate_image(&encoded(ImageFormat::Png)).unwrap(), "image/png");
        assert_eq!(validate_image(&encoded(ImageFormat::Jpeg)).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_validate_invalid_format() {
        assert!(validate_image(b"not an image").is_err());
        assert!(validate_image(&[]).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let mut data = encoded(ImageFormat::Png);
        data.resize(MAX_FILE_SIZE + 1, 0);
        assert!(validate_image(&data).unwrap_err().contains("too large"));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/jpeg"), "jpg");
    }
}
