pub mod box_file;
#[cfg(feature = "rustface")]
pub mod seetaface;

use std::future::Future;

use crate::error::DetectionError;
use crate::models::NormalizedBox;

pub use box_file::BoxFileDetector;
#[cfg(feature = "rustface")]
pub use seetaface::RustfaceDetector;

/// Pluggable face detection backend.
///
/// Receives the raw, still-encoded image bytes and returns one
/// [`NormalizedBox`] per face, in detection order. Implementations may be
/// network-bound; the pipeline bounds the call with its configured timeout.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        image: &[u8],
    ) -> impl Future<Output = Result<Vec<NormalizedBox>, DetectionError>> + Send;
}

/// Detector that always answers with the same boxes
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    boxes: Vec<NormalizedBox>,
}

impl FixedDetector {
    pub fn new(boxes: Vec<NormalizedBox>) -> Self {
        Self { boxes }
    }

    /// Detector that never finds a face
    pub fn empty() -> Self {
        Self::default()
    }
}

impl FaceDetector for FixedDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<NormalizedBox>, DetectionError> {
        Ok(self.boxes.clone())
    }
}

impl<D: FaceDetector> FaceDetector for std::sync::Arc<D> {
    fn detect(
        &self,
        image: &[u8],
    ) -> impl Future<Output = Result<Vec<NormalizedBox>, DetectionError>> + Send {
        self.as_ref().detect(image)
    }
}
