use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

impl Default for OnnxModelCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::Validation("onnx_path empty".into()));
        }
        let path = Path::new(&model.onnx_path);
        if !path.exists() {
            return Err(DomainError::NotFound(format!("model file not found: {}", model.onnx_path)));
        }
        if !path.is_file() {
            return Err(DomainError::Validation(format!("model path is not a file: {}", model.onnx_path)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_and_missing_paths() {
        let catalog = OnnxModelCatalog::new();
        let empty = ModelId { name: "x".into(), onnx_path: " ".into() };
        let missing = ModelId::from_path("/definitely/not/here/yolov8n.onnx");
        assert!(matches!(catalog.validate_model(&empty).await, Err(DomainError::Validation(_))));
        assert!(matches!(catalog.validate_model(&missing).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_directories() {
        let dir = std::env::temp_dir();
        let model = ModelId::from_path(&dir.to_string_lossy());
        assert!(matches!(
            OnnxModelCatalog::new().validate_model(&model).await,
            Err(DomainError::Validation(_))
        ));
    }
}
