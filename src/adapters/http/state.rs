use std::sync::Arc;
use crate::application::services::PredictionService;

/// Estado compartido para los manejadores HTTP de Axum.
#[derive(Clone)]
pub struct HttpState {
    /// Caso de uso decodificar + detectar + formatear, con la única instancia del detector.
    pub prediction: Arc<PredictionService>,
}

impl HttpState {
    pub fn new(prediction: PredictionService) -> Self {
        Self { prediction: Arc::new(prediction) }
    }
}
