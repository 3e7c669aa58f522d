use crate::error::DetectorError;
use base64::{engine::general_purpose, Engine as _};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// True when the image has no pixels to run inference on
pub fn is_blank(image: &DynamicImage) -> bool {
    let (width, height) = image.dimensions();
    width == 0 || height == 0
}

/// Downscale so the longest side is at most `max_dimension`, keeping the
/// aspect ratio. Smaller images are returned unchanged.
pub fn fit_to_max_dimension(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return image.clone();
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);

    // Triangle is the closest area-averaging filter for downscaling
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Encode image to base64 PNG
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, DetectorError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| DetectorError::InvalidImage(format!("Failed to encode image: {}", e)))?;
    Ok(general_purpose::STANDARD.encode(&buffer))
}

/// Decode a base64 image payload in any format the image crate recognises
pub fn decode_base64_image(data: &str) -> Result<DynamicImage, DetectorError> {
    let bytes = general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| DetectorError::InvalidResponse(format!("Invalid base64 image: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| DetectorError::InvalidResponse(format!("Failed to decode image: {}", e)))
}
