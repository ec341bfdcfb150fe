#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from facepixel for tests
pub use facepixel::{
    BoxFileDetector, DetectionError, FaceRedactor, FixedDetector, ImageCodec, ImageRsCodec,
    NormalizedBox, OutputFormat, RedactionError, RedactionResult, RedactionSettings,
};
