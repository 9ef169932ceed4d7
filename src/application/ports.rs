use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{detection::ResultSet, errors::DomainResult, model::ModelId};

/// Colaborador de detección. Una llamada puede devolver varios conjuntos de resultados;
/// una sola imagen normalmente produce uno.
#[async_trait]
pub trait DetectorPort: Send + Sync {
    async fn detect(&self, image: RgbImage) -> DomainResult<Vec<ResultSet>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
