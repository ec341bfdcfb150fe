//! Blur the faces in a still image.
//!
//! A [`FaceDetector`] locates faces as [`NormalizedBox`]es, [`map_to_pixels`]
//! turns each into a [`PixelRectangle`], [`redact_region`] blurs it into an
//! [`OverlayPatch`], and [`FaceRedactor`] runs the per-face work concurrently
//! before compositing and encoding the result.
//!
//! ```no_run
//! use facepixel::{FaceRedactor, FixedDetector, NormalizedBox, RedactionResult};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let bytes = std::fs::read("photo.jpg")?;
//! let detector = FixedDetector::new(vec![NormalizedBox::new(0.1, 0.2, 0.3, 0.4)]);
//! match FaceRedactor::new(detector).redact_faces(&bytes).await? {
//!     RedactionResult::Redacted(image) => std::fs::write("photo_pixelated.webp", image.data)?,
//!     RedactionResult::NoFaces { .. } => println!("nothing to blur"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod detection;
pub mod error;
pub mod mapping;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod redactor;

pub use codec::{ImageCodec, ImageRsCodec, OutputFormat};
pub use config::RedactionSettings;
#[cfg(feature = "rustface")]
pub use detection::RustfaceDetector;
pub use detection::{BoxFileDetector, FaceDetector, FixedDetector};
pub use error::{BoxRejection, CodecError, DetectionError, RedactionError};
pub use mapping::map_to_pixels;
pub use models::{
    ImageDimensions, NormalizedBox, OverlayPatch, PixelRectangle, RedactedImage, RedactionResult,
};
pub use output::pixelated_path;
pub use pipeline::FaceRedactor;
pub use redactor::{DEFAULT_BLUR_STRENGTH, redact_region};
