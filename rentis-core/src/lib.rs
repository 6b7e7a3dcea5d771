pub mod models;
pub mod overlap;
pub mod permissions;
pub mod pricing;
pub mod repository;
pub mod visibility;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Datastore error: {0}")]
    Datastore(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
