use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs as async_fs;

use super::FaceDetector;
use crate::error::DetectionError;
use crate::models::NormalizedBox;

/// Detector that replays detections saved to a JSON file.
///
/// Two layouts are understood:
///
/// ```json
/// [{"left": 0.1, "top": 0.2, "width": 0.3, "height": 0.4}]
/// ```
///
/// or a stored DetectFaces response:
///
/// ```json
/// {"FaceDetails": [{"BoundingBox": {"Left": 0.1, "Top": 0.2, "Width": 0.3, "Height": 0.4}}]}
/// ```
///
/// The file is read on every call, so it can be rewritten between runs.
#[derive(Debug, Clone)]
pub struct BoxFileDetector {
    path: PathBuf,
}

impl BoxFileDetector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoxFile {
    Boxes(Vec<NormalizedBox>),
    Response(DetectFacesResponse),
}

#[derive(Deserialize)]
struct DetectFacesResponse {
    #[serde(rename = "FaceDetails", alias = "face_details", default)]
    face_details: Vec<FaceDetail>,
}

#[derive(Deserialize)]
struct FaceDetail {
    #[serde(rename = "BoundingBox", alias = "bounding_box", default)]
    bounding_box: Option<NormalizedBox>,
}

/// Parse either box file layout.
///
/// A face entry without a bounding box becomes an all-absent box, which the
/// coordinate mapper later rejects.
pub fn parse_boxes(json: &str) -> Result<Vec<NormalizedBox>, DetectionError> {
    let parsed: BoxFile =
        serde_json::from_str(json).map_err(|e| DetectionError::InvalidResponse(e.to_string()))?;
    let boxes = match parsed {
        BoxFile::Boxes(boxes) => boxes,
        BoxFile::Response(response) => response
            .face_details
            .into_iter()
            .map(|face| face.bounding_box.unwrap_or_default())
            .collect(),
    };
    Ok(boxes)
}

impl FaceDetector for BoxFileDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<NormalizedBox>, DetectionError> {
        let json = async_fs::read_to_string(&self.path).await.map_err(|e| {
            DetectionError::Unavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_boxes(&json)
    }
}
