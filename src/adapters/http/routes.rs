use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{DetectionResponse, HealthResponse, UploadedImage};
use crate::domain::errors::DomainError;

/// Campo multipart que transporta la imagen.
pub const FILE_FIELD: &str = "file";

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn predict(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let mut multipart = multipart?;
    let upload = read_file_field(&mut multipart).await?;
    let response = st.prediction.predict(upload).await?;
    Ok(Json(response))
}

/// Lee en memoria la parte `file`. Si llegan varias gana la última; el resto de campos
/// se descarta.
async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedImage, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Una parte sin filename es un campo de texto, no un fichero.
        let Some(filename) = field.file_name().map(str::to_owned) else {
            return Err(DomainError::Validation(format!(
                "field `{FILE_FIELD}` must be a file upload with a filename"
            ))
            .into());
        };
        let bytes = field.bytes().await?;
        upload = Some(UploadedImage { filename, bytes: bytes.to_vec() });
    }
    upload.ok_or_else(|| DomainError::Validation(format!("field `{FILE_FIELD}` is required")).into())
}
