use std::fmt;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::codec::OutputFormat;

/// Face location as fractions of the image width and height.
///
/// Every field is optional: a detector that omits a coordinate produces `None`,
/// which is a different state from a coordinate of `Some(0.0)` (a face touching
/// the image edge).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    #[serde(default, alias = "Left")]
    pub left: Option<f64>,
    #[serde(default, alias = "Top")]
    pub top: Option<f64>,
    #[serde(default, alias = "Width")]
    pub width: Option<f64>,
    #[serde(default, alias = "Height")]
    pub height: Option<f64>,
}

impl NormalizedBox {
    /// Box with all four fields present
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Box covering the whole frame
    pub fn full_frame() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

/// Pixel dimensions of a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle in the source image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRectangle {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge. Computed in u64 so it cannot wrap.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Check that the rectangle lies entirely inside an image of `dims`
    pub fn fits_within(&self, dims: ImageDimensions) -> bool {
        self.right() <= dims.width as u64 && self.bottom() <= dims.height as u64
    }

    pub fn intersects(&self, other: &PixelRectangle) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }
}

impl fmt::Display for PixelRectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Blurred region plus where it goes in the destination image.
///
/// Consumed by compositing; never reused across runs.
#[derive(Debug, Clone)]
pub struct OverlayPatch {
    pub image: DynamicImage,
    pub x: u32,
    pub y: u32,
}

impl OverlayPatch {
    pub fn new(image: DynamicImage, x: u32, y: u32) -> Self {
        Self { image, x, y }
    }

    /// Footprint of the patch in destination coordinates
    pub fn bounds(&self) -> PixelRectangle {
        PixelRectangle::new(self.x, self.y, self.image.width(), self.image.height())
    }
}

/// Encoded output of a successful redaction
#[derive(Debug, Clone)]
pub struct RedactedImage {
    /// The encoded image bytes
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Size of the input in bytes
    pub original_size: usize,
    pub faces_redacted: usize,
    /// Detections dropped by geometric validation
    pub faces_skipped: usize,
}

/// Outcome of [`crate::FaceRedactor::redact_faces`]
#[derive(Debug, Clone)]
pub enum RedactionResult {
    Redacted(RedactedImage),
    /// Nothing to redact. `detected` counts the detections that were returned
    /// but rejected; it is zero when the detector found no faces at all.
    NoFaces { detected: usize },
}

impl RedactionResult {
    pub fn is_redacted(&self) -> bool {
        matches!(self, RedactionResult::Redacted(_))
    }

    pub fn into_image(self) -> Option<RedactedImage> {
        match self {
            RedactionResult::Redacted(image) => Some(image),
            RedactionResult::NoFaces { .. } => None,
        }
    }
}
