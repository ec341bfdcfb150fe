use anyhow::{Context, bail};
use clap::Parser;
use clap::error::ErrorKind;
use log::{LevelFilter, debug, info};
use std::path::{Path, PathBuf};

use facepixel::{
    BoxFileDetector, FaceDetector, FaceRedactor, ImageCodec, ImageRsCodec, OutputFormat,
    RedactionResult, RedactionSettings, pixelated_path,
};

#[derive(Parser)]
#[command(name = "facepixel")]
#[command(about = "Blur every face found in an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Settings JSON (blur strength, output format, detection timeout)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use face boxes saved in a JSON file instead of running the detector
    #[arg(long, value_name = "FILE")]
    boxes: Option<PathBuf>,

    /// SeetaFace model used for on-device detection
    #[cfg(feature = "rustface")]
    #[arg(long, value_name = "FILE", default_value = "model/seeta_fd_frontal_v1.0.bin")]
    model: PathBuf,

    /// Gaussian blur sigma in pixels (overrides the settings file)
    #[arg(long, value_name = "SIGMA")]
    strength: Option<f32>,

    /// Output format: webp, png or jpeg (overrides the settings file)
    #[arg(long)]
    format: Option<OutputFormat>,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    )
    .init();
}

/// Exit status for an argument error. Help output is not a failure; every
/// usage error exits with 1 like any other failure.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(args) => args,
        Err(err) if usage_exit_code(&err) == 0 => err.exit(),
        Err(err) => {
            eprint!("{err}");
            std::process::exit(usage_exit_code(&err))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    init_logging(args.verbose);

    let image_path = &args.image_path;
    if !image_path.exists() {
        bail!("File does not exist: {}", image_path.display());
    }

    let mut settings = match &args.config {
        Some(path) => RedactionSettings::load(path)?,
        None => RedactionSettings::default(),
    };
    if let Some(strength) = args.strength {
        settings.blur_strength = strength;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }
    settings.validate()?;

    let bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read {}", image_path.display()))?;
    let codec = ImageRsCodec::new();
    let dims = codec
        .read_dimensions(&bytes)
        .with_context(|| format!("Not a valid image file: {}", image_path.display()))?;
    info!("Using {} ({})", image_path.display(), dims);

    let output = match &args.boxes {
        Some(path) => {
            debug!("Reading face boxes from {}", path.display());
            redact(BoxFileDetector::new(path), codec, settings, image_path, &bytes).await?
        }
        None => detect_and_redact(&args, codec, settings, image_path, &bytes).await?,
    };

    info!("Pixelated image written to {}", output.display());
    Ok(())
}

#[cfg(feature = "rustface")]
async fn detect_and_redact(
    args: &Cli,
    codec: ImageRsCodec,
    settings: RedactionSettings,
    image_path: &Path,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    let detector = facepixel::RustfaceDetector::from_model_file(&args.model)?;
    redact(detector, codec, settings, image_path, bytes).await
}

#[cfg(not(feature = "rustface"))]
async fn detect_and_redact(
    _args: &Cli,
    _codec: ImageRsCodec,
    _settings: RedactionSettings,
    _image_path: &Path,
    _bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    bail!("No face detector available: pass --boxes or build with the `rustface` feature")
}

async fn redact<D: FaceDetector>(
    detector: D,
    codec: ImageRsCodec,
    settings: RedactionSettings,
    image_path: &Path,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    let format = settings.output_format;
    let redactor = FaceRedactor::new(detector)
        .with_codec(codec)
        .with_settings(settings);

    match redactor.redact_faces(bytes).await? {
        RedactionResult::Redacted(image) => {
            let output = pixelated_path(image_path, format);
            tokio::fs::write(&output, &image.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            Ok(output)
        }
        RedactionResult::NoFaces { detected: 0 } => {
            bail!("No faces found in {}", image_path.display())
        }
        RedactionResult::NoFaces { detected } => {
            bail!("None of the {} detected faces could be pixelated", detected)
        }
    }
}
