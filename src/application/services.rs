use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use tracing::{info, warn};

use crate::{
    application::{
        dto::{DetectionResponse, UploadedImage},
        ports::DetectorPort,
    },
    domain::{
        detection::{Detection, ResultSet},
        errors::{DomainError, DomainResult},
    },
};

/// Caso de uso de predicción: decodifica la imagen subida, ejecuta el detector
/// y da forma a la respuesta.
#[derive(Clone)]
pub struct PredictionService {
    detector: Arc<dyn DetectorPort>,
}

impl PredictionService {
    pub fn new(detector: Arc<dyn DetectorPort>) -> Self {
        Self { detector }
    }

    pub async fn predict(&self, upload: UploadedImage) -> DomainResult<DetectionResponse> {
        let UploadedImage { filename, bytes } = upload;
        let size = bytes.len();
        let image = decode_upload(bytes).await.inspect_err(|e| {
            warn!(filename = %filename, bytes = size, "Imagen rechazada: {e}");
        })?;
        let (width, height) = image.dimensions();

        let started = Instant::now();
        let results = self.detector.detect(image).await?;
        let detections = collect_detections(&results);

        info!(
            filename = %filename,
            width,
            height,
            count = detections.len(),
            infer_ms = started.elapsed().as_secs_f32() * 1000.0,
            "Predicción completada"
        );

        Ok(DetectionResponse::new(filename, detections))
    }
}

/// Decodifica en el pool bloqueante de tokio para no ocupar los workers async.
pub async fn decode_upload(bytes: Vec<u8>) -> DomainResult<RgbImage> {
    tokio::task::spawn_blocking(move || decode_rgb(&bytes))
        .await
        .map_err(|e| DomainError::Decode(format!("decoder task failed: {e}")))?
}

/// Decodifica cualquier formato soportado y lo convierte a RGB de 8 bits.
pub fn decode_rgb(bytes: &[u8]) -> DomainResult<RgbImage> {
    if bytes.is_empty() {
        return Err(DomainError::Decode("upload is empty".into()));
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DomainError::Decode(e.to_string()))
}

/// Aplana todos los conjuntos de resultados respetando el orden de emisión.
pub fn collect_detections(results: &[ResultSet]) -> Vec<Detection> {
    results
        .iter()
        .flat_map(|set| set.boxes.iter().map(move |b| Detection::from_raw(b, &set.names)))
        .collect()
}
