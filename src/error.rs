use std::time::Duration;

use thiserror::Error;

use crate::models::PixelRectangle;

/// Failure of a redaction run.
///
/// Variants separate "fix your input" ([`RedactionError::InvalidImage`]) from
/// "retry the detection call" ([`RedactionError::DetectionService`]) from
/// per-face processing failures. Finding nothing to redact is not an error; see
/// [`crate::RedactionResult::NoFaces`].
#[derive(Debug, Error)]
pub enum RedactionError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("face detection failed: {0}")]
    DetectionService(#[from] DetectionError),

    #[error("failed to redact face region: {0}")]
    RegionExtraction(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a [`crate::FaceDetector`]
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detector did not answer within {0:?}")]
    Timeout(Duration),

    #[error("detector unavailable: {0}")]
    Unavailable(String),

    #[error("invalid detector response: {0}")]
    InvalidResponse(String),
}

/// Failure reported by an [`crate::ImageCodec`]
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("region {rect} lies outside the {width}x{height} image")]
    OutOfBounds {
        rect: PixelRectangle,
        width: u32,
        height: u32,
    },

    #[error("blur strength must be a positive number, got {0}")]
    InvalidStrength(f32),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Why a detection was dropped before redaction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoxRejection {
    #[error("bounding box is missing `{0}`")]
    MissingField(&'static str),

    #[error("bounding box `{0}` is not a finite number")]
    NonFinite(&'static str),

    #[error("bounding box maps to an empty {width}x{height} region")]
    Empty { width: i64, height: i64 },

    #[error("bounding box {width}x{height}+{x}+{y} exceeds the {image_width}x{image_height} image")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    },
}
