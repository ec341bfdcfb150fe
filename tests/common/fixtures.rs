use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use facepixel::{
    CodecError, DetectionError, FaceDetector, ImageCodec, ImageRsCodec, NormalizedBox,
    OutputFormat, OverlayPatch, PixelRectangle,
};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};

/// Creates a PNG with a 4px red/blue checkerboard, so any blur is visible.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 { Rgb([220, 30, 30]) } else { Rgb([30, 30, 220]) }
    });
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .expect("Failed to encode test image");
    buffer
}

/// Decodes output bytes back into RGB pixels
pub fn decode_rgb(bytes: &[u8]) -> RgbImage {
    image::load_from_memory(bytes)
        .expect("Failed to decode output image")
        .to_rgb8()
}

/// Detector that always fails, as a detection service outage would
pub struct FailingDetector;

impl FaceDetector for FailingDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<NormalizedBox>, DetectionError> {
        Err(DetectionError::Unavailable("quota exceeded".to_string()))
    }
}

/// Detector that answers only after `delay`
pub struct SlowDetector {
    pub delay: Duration,
    pub boxes: Vec<NormalizedBox>,
}

impl FaceDetector for SlowDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<NormalizedBox>, DetectionError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.boxes.clone())
    }
}

/// Codec whose region extraction fails for one rectangle origin.
/// Counts how many times `composite` and `encode` run.
pub struct FailingCodec {
    inner: ImageRsCodec,
    fail_at: (u32, u32),
    pub composites: AtomicUsize,
    pub encodes: AtomicUsize,
}

impl FailingCodec {
    pub fn failing_at(x: u32, y: u32) -> Self {
        Self {
            inner: ImageRsCodec::new(),
            fail_at: (x, y),
            composites: AtomicUsize::new(0),
            encodes: AtomicUsize::new(0),
        }
    }
}

impl ImageCodec for FailingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        self.inner.decode(bytes)
    }

    fn extract_region(
        &self,
        image: &DynamicImage,
        rect: PixelRectangle,
    ) -> Result<DynamicImage, CodecError> {
        if (rect.x, rect.y) == self.fail_at {
            return Err(CodecError::Decode("simulated extraction failure".to_string()));
        }
        self.inner.extract_region(image, rect)
    }

    fn blur(&self, region: &DynamicImage, strength: f32) -> Result<DynamicImage, CodecError> {
        self.inner.blur(region, strength)
    }

    fn composite(
        &self,
        base: DynamicImage,
        overlays: Vec<OverlayPatch>,
    ) -> Result<DynamicImage, CodecError> {
        self.composites.fetch_add(1, Ordering::SeqCst);
        self.inner.composite(base, overlays)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(image, format, jpeg_quality)
    }
}

/// Codec that stalls region extraction per rectangle origin, so faces finish
/// in whatever order the delays dictate.
pub struct StaggeredCodec {
    inner: ImageRsCodec,
    delays: Vec<((u32, u32), Duration)>,
}

impl StaggeredCodec {
    pub fn new(delays: Vec<((u32, u32), Duration)>) -> Self {
        Self { inner: ImageRsCodec::new(), delays }
    }
}

impl ImageCodec for StaggeredCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        self.inner.decode(bytes)
    }

    fn extract_region(
        &self,
        image: &DynamicImage,
        rect: PixelRectangle,
    ) -> Result<DynamicImage, CodecError> {
        if let Some((_, delay)) = self.delays.iter().find(|(origin, _)| *origin == (rect.x, rect.y)) {
            std::thread::sleep(*delay);
        }
        self.inner.extract_region(image, rect)
    }

    fn blur(&self, region: &DynamicImage, strength: f32) -> Result<DynamicImage, CodecError> {
        self.inner.blur(region, strength)
    }

    fn composite(
        &self,
        base: DynamicImage,
        overlays: Vec<OverlayPatch>,
    ) -> Result<DynamicImage, CodecError> {
        self.inner.composite(base, overlays)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        self.inner.encode(image, format, jpeg_quality)
    }
}
