use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::models::{ImageDimensions, OverlayPatch, PixelRectangle};

/// Encoding used for the redacted output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Lossless WebP (the pure-Rust encoder has no lossy mode)
    #[default]
    Webp,
    Png,
    /// Lossy JPEG; alpha is dropped
    Jpeg,
}

impl OutputFormat {
    /// File extension without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unknown output format '{other}' (expected webp, png or jpeg)")),
        }
    }
}

/// Image primitives the redaction pipeline is built on.
///
/// Implementations must be deterministic: the same input and arguments give the
/// same pixels. The pipeline calls `extract_region` and `blur` from several
/// blocking tasks at once, hence `Send + Sync`.
pub trait ImageCodec: Send + Sync {
    /// Read the pixel dimensions without decoding the full raster.
    fn read_dimensions(&self, bytes: &[u8]) -> Result<ImageDimensions, CodecError> {
        self.decode(bytes).map(|image| ImageDimensions::of(&image))
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Copy `rect` out of `image`. Fails if the rectangle is not fully inside.
    fn extract_region(
        &self,
        image: &DynamicImage,
        rect: PixelRectangle,
    ) -> Result<DynamicImage, CodecError>;

    fn blur(&self, region: &DynamicImage, strength: f32) -> Result<DynamicImage, CodecError>;

    /// Paint `overlays` onto `base` in order. Later patches overwrite earlier ones.
    fn composite(
        &self,
        base: DynamicImage,
        overlays: Vec<OverlayPatch>,
    ) -> Result<DynamicImage, CodecError>;

    /// Encode `image`. `jpeg_quality` (1..=100) only applies to [`OutputFormat::Jpeg`].
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, CodecError>;
}

/// [`ImageCodec`] backed by the `image` and `imageproc` crates.
///
/// Decoded rasters are normalized to 8-bit RGB, or RGBA when the source has an
/// alpha channel. Blur is a Gaussian with `sigma = strength` pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Convert to the two pixel layouts the codec works in
fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

impl ImageCodec for ImageRsCodec {
    fn read_dimensions(&self, bytes: &[u8]) -> Result<ImageDimensions, CodecError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(ImageDimensions::new(width, height))
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let image = image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(normalize(image))
    }

    fn extract_region(
        &self,
        image: &DynamicImage,
        rect: PixelRectangle,
    ) -> Result<DynamicImage, CodecError> {
        let (width, height) = image.dimensions();
        if rect.is_empty() || !rect.fits_within(ImageDimensions::new(width, height)) {
            return Err(CodecError::OutOfBounds { rect, width, height });
        }
        Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height))
    }

    fn blur(&self, region: &DynamicImage, strength: f32) -> Result<DynamicImage, CodecError> {
        // gaussian_blur_f32 panics on a non-positive sigma
        if !(strength.is_finite() && strength > 0.0) {
            return Err(CodecError::InvalidStrength(strength));
        }
        let blurred = match region {
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(gaussian_blur_f32(buf, strength)),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(gaussian_blur_f32(buf, strength)),
            other if other.color().has_alpha() => {
                DynamicImage::ImageRgba8(gaussian_blur_f32(&other.to_rgba8(), strength))
            }
            other => DynamicImage::ImageRgb8(gaussian_blur_f32(&other.to_rgb8(), strength)),
        };
        Ok(blurred)
    }

    fn composite(
        &self,
        base: DynamicImage,
        overlays: Vec<OverlayPatch>,
    ) -> Result<DynamicImage, CodecError> {
        let mut canvas = normalize(base);
        let (width, height) = canvas.dimensions();

        for patch in overlays {
            let rect = patch.bounds();
            if !rect.fits_within(ImageDimensions::new(width, height)) {
                return Err(CodecError::OutOfBounds { rect, width, height });
            }
            // Replace rather than alpha-blend so a translucent face never shows through
            match &mut canvas {
                DynamicImage::ImageRgba8(buf) => {
                    image::imageops::replace(buf, &patch.image.to_rgba8(), rect.x as i64, rect.y as i64)
                }
                DynamicImage::ImageRgb8(buf) => {
                    image::imageops::replace(buf, &patch.image.to_rgb8(), rect.x as i64, rect.y as i64)
                }
                other => {
                    let mut buf = other.to_rgba8();
                    image::imageops::replace(&mut buf, &patch.image.to_rgba8(), rect.x as i64, rect.y as i64);
                    *other = DynamicImage::ImageRgba8(buf);
                }
            }
        }

        Ok(canvas)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let (width, height) = image.dimensions();

        let (raw_data, color_type) = match format {
            OutputFormat::Jpeg => (image.to_rgb8().into_raw(), ExtendedColorType::Rgb8),
            _ if image.color().has_alpha() => (image.to_rgba8().into_raw(), ExtendedColorType::Rgba8),
            _ => (image.to_rgb8().into_raw(), ExtendedColorType::Rgb8),
        };

        let written = match format {
            OutputFormat::Webp => {
                WebPEncoder::new_lossless(&mut buffer).write_image(&raw_data, width, height, color_type)
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut buffer).write_image(&raw_data, width, height, color_type)
            }
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100))
                .write_image(&raw_data, width, height, color_type),
        };
        written.map_err(|e| CodecError::Encode(e.to_string()))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn decode_rejects_garbage() {
        let codec = ImageRsCodec::new();
        assert!(matches!(codec.decode(b"not an image"), Err(CodecError::Decode(_))));
        assert!(codec.read_dimensions(b"not an image").is_err());
    }

    #[test]
    fn read_dimensions_matches_decode() {
        let codec = ImageRsCodec::new();
        let png = codec.encode(&checkerboard(30, 20), OutputFormat::Png, 90).unwrap();
        assert_eq!(codec.read_dimensions(&png).unwrap(), ImageDimensions::new(30, 20));
        assert_eq!(ImageDimensions::of(&codec.decode(&png).unwrap()), ImageDimensions::new(30, 20));
    }

    #[test]
    fn extract_region_checks_bounds() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(16, 16);
        let region = codec.extract_region(&img, PixelRectangle::new(4, 8, 12, 8)).unwrap();
        assert_eq!(region.dimensions(), (12, 8));

        let err = codec.extract_region(&img, PixelRectangle::new(8, 8, 9, 1)).unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds { .. }));
        assert!(codec.extract_region(&img, PixelRectangle::new(0, 0, 0, 4)).is_err());
    }

    #[test]
    fn blur_smooths_and_keeps_size() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(32, 32);
        let blurred = codec.blur(&img, 4.0).unwrap();
        assert_eq!(blurred.dimensions(), (32, 32));
        // A hard checkerboard edge turns grey
        let centre = blurred.to_rgb8().get_pixel(16, 16).0[0];
        assert!(centre > 20 && centre < 235, "centre pixel {centre} was not smoothed");
    }

    #[test]
    fn blur_is_deterministic() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(24, 18);
        let a = codec.blur(&img, 3.5).unwrap();
        let b = codec.blur(&img, 3.5).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn blur_rejects_non_positive_strength() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(8, 8);
        assert!(matches!(codec.blur(&img, 0.0), Err(CodecError::InvalidStrength(_))));
        assert!(codec.blur(&img, -1.0).is_err());
        assert!(codec.blur(&img, f32::NAN).is_err());
    }

    #[test]
    fn composite_replaces_pixels_and_last_wins() {
        let codec = ImageRsCodec::new();
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
        let blue = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 255])));

        let out = codec
            .composite(base, vec![OverlayPatch::new(red, 2, 2), OverlayPatch::new(blue, 4, 4)])
            .unwrap()
            .to_rgb8();

        assert_eq!(out.get_pixel(2, 2), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(5, 5), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(9, 9), &Rgb([0, 0, 0]));
    }

    #[test]
    fn composite_does_not_blend_translucent_patches() {
        let codec = ImageRsCodec::new();
        let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])));
        let patch = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 0])));
        let out = codec.composite(base, vec![OverlayPatch::new(patch, 0, 0)]).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(1, 1), &Rgba([10, 10, 10, 0]));
    }

    #[test]
    fn composite_rejects_overhanging_patch() {
        let codec = ImageRsCodec::new();
        let patch = checkerboard(4, 4);
        let err = codec.composite(checkerboard(6, 6), vec![OverlayPatch::new(patch, 3, 0)]).unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds { .. }));
    }

    #[test]
    fn encodes_each_format_with_its_magic() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(16, 12);

        let webp = codec.encode(&img, OutputFormat::Webp, 90).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");

        let png = codec.encode(&img, OutputFormat::Png, 90).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let jpeg = codec.encode(&img, OutputFormat::Jpeg, 70).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFFu8, 0xD8]);
    }

    #[test]
    fn jpeg_quality_changes_output() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(64, 64);
        let low = codec.encode(&img, OutputFormat::Jpeg, 10).unwrap();
        let high = codec.encode(&img, OutputFormat::Jpeg, 95).unwrap();
        assert!(low.len() < high.len(), "q10 {} bytes, q95 {} bytes", low.len(), high.len());
        // Out-of-range quality is clamped rather than rejected
        assert_eq!(codec.encode(&img, OutputFormat::Jpeg, 0).unwrap(), codec.encode(&img, OutputFormat::Jpeg, 1).unwrap());
    }

    #[test]
    fn lossless_webp_round_trips_pixels() {
        let codec = ImageRsCodec::new();
        let img = checkerboard(16, 12);
        let webp = codec.encode(&img, OutputFormat::Webp, 90).unwrap();
        let decoded = codec.decode(&webp).unwrap();
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("WebP".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }
}
