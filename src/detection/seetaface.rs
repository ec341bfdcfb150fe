use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use log::debug;

use super::FaceDetector;
use crate::error::DetectionError;
use crate::models::NormalizedBox;

/// On-device face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model file is loaded once; every call builds a fresh detector from a
/// clone of it because `rustface` detectors need `&mut self`.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
    score_threshold: f64,
}

impl RustfaceDetector {
    /// Load a SeetaFace frontal model (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn from_model_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open face model {}", path.display()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("Failed to load face model {}: {}", path.display(), e))?;
        Ok(Self {
            model,
            min_face_size: 20,
            score_threshold: 2.0,
        })
    }

    /// Smallest face side in pixels the detector looks for (default: 20)
    pub fn with_min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }

    /// Minimum SeetaFace score for a detection (default: 2.0)
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn run(
        model: rustface::Model,
        min_face_size: u32,
        score_threshold: f64,
        bytes: &[u8],
    ) -> Result<Vec<NormalizedBox>, DetectionError> {
        let gray = image::load_from_memory(bytes)
            .map_err(|e| DetectionError::InvalidResponse(format!("cannot decode image: {e}")))?
            .to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(score_threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
        debug!("SeetaFace found {} candidate faces", faces.len());

        let boxes = faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                // SeetaFace boxes may hang off the frame; clip before normalizing
                let x0 = (bbox.x() as i64).clamp(0, width as i64);
                let y0 = (bbox.y() as i64).clamp(0, height as i64);
                let x1 = (bbox.x() as i64 + bbox.width() as i64).clamp(0, width as i64);
                let y1 = (bbox.y() as i64 + bbox.height() as i64).clamp(0, height as i64);
                NormalizedBox::new(
                    x0 as f64 / width as f64,
                    y0 as f64 / height as f64,
                    (x1 - x0) as f64 / width as f64,
                    (y1 - y0) as f64 / height as f64,
                )
            })
            .collect();
        Ok(boxes)
    }
}

impl FaceDetector for RustfaceDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<NormalizedBox>, DetectionError> {
        let model = self.model.clone();
        let (min_face_size, score_threshold) = (self.min_face_size, self.score_threshold);
        let bytes = image.to_vec();

        tokio::task::spawn_blocking(move || Self::run(model, min_face_size, score_threshold, &bytes))
            .await
            .map_err(|e| DetectionError::Unavailable(format!("detector task failed: {e}")))?
    }
}
