use std::path::{Path, PathBuf};

use crate::codec::OutputFormat;

/// Path of the redacted copy of `input`: same directory, `_pixelated` appended
/// to the file stem, extension taken from `format`.
pub fn pixelated_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}_pixelated.{}", stem, format.extension()))
}
