use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use log::{debug, info, warn};
use tokio::task::JoinSet;

use crate::codec::{ImageCodec, ImageRsCodec, OutputFormat};
use crate::config::RedactionSettings;
use crate::detection::FaceDetector;
use crate::error::{DetectionError, RedactionError};
use crate::mapping::map_to_pixels;
use crate::models::{
    ImageDimensions, NormalizedBox, OverlayPatch, PixelRectangle, RedactedImage, RedactionResult,
};
use crate::redactor::redact_region;

/// Detects faces in an image and blurs each one.
///
/// Generic over the detection and image backends so either can be swapped for
/// another provider or a test fake. Holds no per-image state: one instance can
/// serve any number of [`FaceRedactor::redact_faces`] calls.
pub struct FaceRedactor<D, C = ImageRsCodec> {
    detector: D,
    codec: Arc<C>,
    settings: RedactionSettings,
}

impl<D: FaceDetector> FaceRedactor<D, ImageRsCodec> {
    /// Create a redactor using the built-in `image`/`imageproc` codec
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            codec: Arc::new(ImageRsCodec::new()),
            settings: RedactionSettings::default(),
        }
    }
}

impl<D: FaceDetector, C: ImageCodec + 'static> FaceRedactor<D, C> {
    /// Replace the image backend
    pub fn with_codec<C2: ImageCodec + 'static>(self, codec: C2) -> FaceRedactor<D, C2> {
        FaceRedactor {
            detector: self.detector,
            codec: Arc::new(codec),
            settings: self.settings,
        }
    }

    pub fn with_settings(mut self, settings: RedactionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_blur_strength(mut self, strength: f32) -> Self {
        self.settings.blur_strength = strength;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.settings.output_format = format;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.settings.jpeg_quality = quality;
        self
    }

    /// Bound the detection call. Dropping the returned future of
    /// [`FaceRedactor::redact_faces`] cancels a run at any point.
    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.settings.detection_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn settings(&self) -> &RedactionSettings {
        &self.settings
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Run detection only and report how many faces were found
    pub async fn count_faces(&self, image: &[u8]) -> Result<usize, RedactionError> {
        Ok(self.detect(image).await?.len())
    }

    /// Blur every detected face in `image` and encode the result.
    ///
    /// Returns [`RedactionResult::NoFaces`] when the detector finds nothing, or
    /// when every detection fails geometric validation. Any failure while
    /// redacting an accepted face aborts the whole image; there is no partial
    /// output.
    pub async fn redact_faces(&self, image: &[u8]) -> Result<RedactionResult, RedactionError> {
        self.settings.validate()?;

        let source = self
            .codec
            .decode(image)
            .map_err(|e| RedactionError::InvalidImage(e.to_string()))?;
        let dims = ImageDimensions::of(&source);
        if dims.is_empty() {
            return Err(RedactionError::InvalidImage("image dimensions are zero".to_string()));
        }

        let boxes = self.detect(image).await?;
        info!("Found {} faces", boxes.len());
        if boxes.is_empty() {
            return Ok(RedactionResult::NoFaces { detected: 0 });
        }

        let source = Arc::new(source);
        let patches = self.redact_regions(&source, dims, &boxes).await?;
        let faces_redacted = patches.len();
        let faces_skipped = boxes.len() - faces_redacted;
        if patches.is_empty() {
            info!("All {} detections were rejected; nothing to redact", boxes.len());
            return Ok(RedactionResult::NoFaces { detected: boxes.len() });
        }
        warn_on_overlap(&patches);

        let started = Instant::now();
        let codec = Arc::clone(&self.codec);
        let format = self.settings.output_format;
        let jpeg_quality = self.settings.jpeg_quality;
        let data = tokio::task::spawn_blocking(move || {
            let base = Arc::try_unwrap(source).unwrap_or_else(|shared| (*shared).clone());
            let composed = codec.composite(base, patches)?;
            codec.encode(&composed, format, jpeg_quality)
        })
        .await
        .map_err(|e| RedactionError::Encode(format!("encode task failed: {e}")))?
        .map_err(|e| RedactionError::Encode(e.to_string()))?;
        debug!("Composited and encoded {} bytes of {} in {:?}", data.len(), format, started.elapsed());

        info!("Pixelated {} faces ({} skipped)", faces_redacted, faces_skipped);
        Ok(RedactionResult::Redacted(RedactedImage {
            data,
            format,
            width: dims.width,
            height: dims.height,
            original_size: image.len(),
            faces_redacted,
            faces_skipped,
        }))
    }

    async fn detect(&self, image: &[u8]) -> Result<Vec<NormalizedBox>, RedactionError> {
        let detection = self.detector.detect(image);
        let boxes = match self.settings.detection_timeout() {
            Some(limit) => tokio::time::timeout(limit, detection)
                .await
                .map_err(|_| DetectionError::Timeout(limit))??,
            None => detection.await?,
        };
        Ok(boxes)
    }

    /// Map and redact every box on the blocking pool.
    ///
    /// Patches come back in detection order regardless of which task finishes
    /// first. The first failure aborts the remaining tasks.
    async fn redact_regions(
        &self,
        source: &Arc<DynamicImage>,
        dims: ImageDimensions,
        boxes: &[NormalizedBox],
    ) -> Result<Vec<OverlayPatch>, RedactionError> {
        let mut tasks = JoinSet::new();

        for (index, bbox) in boxes.iter().enumerate() {
            let rect = match map_to_pixels(bbox, dims) {
                Ok(rect) => rect,
                Err(rejection) => {
                    debug!("Skipping face {}: {}", index + 1, rejection);
                    continue;
                }
            };
            let codec = Arc::clone(&self.codec);
            let source = Arc::clone(source);
            let strength = self.settings.blur_strength;
            tasks.spawn_blocking(move || (index, redact_region(codec.as_ref(), &source, rect, strength)));
        }

        let mut slots: Vec<Option<OverlayPatch>> = boxes.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| RedactionError::RegionExtraction(format!("face task failed: {e}")))
                .and_then(|(index, patch)| patch.map(|patch| (index, patch)));
            match outcome {
                Ok((index, patch)) => slots[index] = Some(patch),
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

fn warn_on_overlap(patches: &[OverlayPatch]) {
    let bounds: Vec<PixelRectangle> = patches.iter().map(OverlayPatch::bounds).collect();
    for (i, a) in bounds.iter().enumerate() {
        for b in &bounds[i + 1..] {
            if a.intersects(b) {
                warn!("Face regions {} and {} overlap; the later one is drawn on top", a, b);
            }
        }
    }
}
