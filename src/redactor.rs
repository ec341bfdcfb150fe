use image::DynamicImage;

use crate::codec::ImageCodec;
use crate::error::RedactionError;
use crate::models::{ImageDimensions, OverlayPatch, PixelRectangle};

/// Gaussian sigma, in pixels, applied to each face region unless overridden.
pub const DEFAULT_BLUR_STRENGTH: f32 = 50.0;

/// Extract `rect` from `source`, blur it, and anchor the result at `(rect.x, rect.y)`.
///
/// The rectangle is checked against the source bounds here even when the caller
/// already validated it through [`crate::map_to_pixels`].
pub fn redact_region<C: ImageCodec + ?Sized>(
    codec: &C,
    source: &DynamicImage,
    rect: PixelRectangle,
    blur_strength: f32,
) -> Result<OverlayPatch, RedactionError> {
    if !(blur_strength.is_finite() && blur_strength > 0.0) {
        return Err(RedactionError::InvalidConfig(format!(
            "blur strength must be a positive number, got {blur_strength}"
        )));
    }

    let dims = ImageDimensions::of(source);
    if rect.is_empty() {
        return Err(RedactionError::RegionExtraction(format!("region {rect} is empty")));
    }
    if !rect.fits_within(dims) {
        return Err(RedactionError::RegionExtraction(format!(
            "region {rect} lies outside the {dims} image"
        )));
    }

    let region = codec
        .extract_region(source, rect)
        .map_err(|e| RedactionError::RegionExtraction(format!("region {rect}: {e}")))?;
    let blurred = codec
        .blur(&region, blur_strength)
        .map_err(|e| RedactionError::RegionExtraction(format!("region {rect}: {e}")))?;

    Ok(OverlayPatch::new(blurred, rect.x, rect.y))
}
