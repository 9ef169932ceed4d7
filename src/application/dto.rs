use serde::{Deserialize, Serialize};

use crate::domain::detection::Detection;

/// Imagen subida tal como la recibe la capa HTTP.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub filename: String,
    pub detections: Vec<Detection>,
    pub count: usize,
}

impl DetectionResponse {
    pub fn new(filename: String, detections: Vec<Detection>) -> Self {
        let count = detections.len();
        Self { filename, detections, count }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
