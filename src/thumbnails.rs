//! Thumbnail generation for picked images.

use std::io::Cursor;

use crate::error::ThumbnailError;

/// Default thumbnail bounds, matching the gallery cell size.
pub const THUMBNAIL_WIDTH: u32 = 640;
pub const THUMBNAIL_HEIGHT: u32 = 480;

/// Produce JPEG thumbnail bytes bounded to the default size.
pub fn generate(data: &[u8]) -> Result<Vec<u8>, ThumbnailError> {
    generate_sized(data, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
}

/// Produce JPEG thumbnail bytes bounded to `max_width` x `max_height`,
/// preserving aspect ratio.
pub fn generate_sized(
    data: &[u8],
    max_width: u32,
    max_height: u32,
) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::load_from_memory(data).map_err(ThumbnailError::Decode)?;

    // JPEG has no alpha channel; flatten before encoding.
    let thumbnail = img.thumbnail(max_width, max_height).into_rgb8();

    let mut encoded = Vec::new();
    thumbnail
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .map_err(ThumbnailError::Encode)?;
    Ok(encoded)
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 200]));
    let mut encoded = Vec::new();
    img.write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .expect("encode test image");
    encoded
}
