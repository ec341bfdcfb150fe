use crate::error::BoxRejection;
use crate::models::{ImageDimensions, NormalizedBox, PixelRectangle};

/// Convert a normalized face box into a pixel rectangle inside `dims`.
///
/// Each coordinate is `floor(fraction * dimension)`. Flooring treats the box as a
/// half-open pixel range: a box whose far edge lands at 299.7 covers pixels up to
/// 299 and never pulls in the partially covered pixel.
///
/// Rejected boxes are not errors; the caller skips the face. A field that is
/// `Some(0.0)` is a valid coordinate, only `None` counts as missing.
pub fn map_to_pixels(
    bbox: &NormalizedBox,
    dims: ImageDimensions,
) -> Result<PixelRectangle, BoxRejection> {
    let left = field(bbox.left, "left")?;
    let top = field(bbox.top, "top")?;
    let box_width = field(bbox.width, "width")?;
    let box_height = field(bbox.height, "height")?;

    let x = scale(left, dims.width);
    let y = scale(top, dims.height);
    let width = scale(box_width, dims.width);
    let height = scale(box_height, dims.height);

    if width <= 0 || height <= 0 {
        return Err(BoxRejection::Empty { width, height });
    }

    let out_of_bounds = x < 0
        || y < 0
        || x.saturating_add(width) > dims.width as i64
        || y.saturating_add(height) > dims.height as i64;
    if out_of_bounds {
        return Err(BoxRejection::OutOfBounds {
            x,
            y,
            width,
            height,
            image_width: dims.width,
            image_height: dims.height,
        });
    }

    // All four values are now within 0..=u32::MAX
    Ok(PixelRectangle::new(x as u32, y as u32, width as u32, height as u32))
}

fn field(value: Option<f64>, name: &'static str) -> Result<f64, BoxRejection> {
    match value {
        None => Err(BoxRejection::MissingField(name)),
        Some(v) if !v.is_finite() => Err(BoxRejection::NonFinite(name)),
        Some(v) => Ok(v),
    }
}

fn scale(fraction: f64, extent: u32) -> i64 {
    // Saturating cast; wildly out-of-range fractions end up rejected as out of bounds
    (fraction * extent as f64).floor() as i64
}
