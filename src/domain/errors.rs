use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
