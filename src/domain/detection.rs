use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::labels::LabelSet;

/// Un objeto detectado, tal como se devuelve a los clientes HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    pub bbox: [f64; 4],
}

impl Detection {
    /// La confianza se acota a [0,1] con 3 decimales; las esquinas de la caja, con 1.
    pub fn from_raw(raw: &RawBox, names: &LabelSet) -> Self {
        let confidence = if raw.confidence.is_nan() { 0.0 } else { raw.confidence.clamp(0.0, 1.0) };
        Self {
            class_name: names.name_of(raw.class_index),
            confidence: round_to(confidence as f64, 3),
            bbox: raw.xyxy.map(|v| round_to(v as f64, 1)),
        }
    }
}

/// Caja tal como la emite el detector, en píxeles de la imagen original (`[x1, y1, x2, y2]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBox {
    pub class_index: usize,
    pub confidence: f32,
    pub xyxy: [f32; 4],
}

/// Salida del detector para una imagen.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub names: Arc<LabelSet>,
    pub boxes: Vec<RawBox>,
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
