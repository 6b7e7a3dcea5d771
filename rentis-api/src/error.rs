use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rentis_core::permissions::PermissionDecision;
use rentis_core::CoreError;
use rentis_guard::GuardError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    PermissionDenied(PermissionDecision),
    Banned(String),
    RateLimited { ms_before_next: i64 },
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": msg })),
            )
                .into_response(),
            AppError::PermissionDenied(decision) => {
                let message = decision
                    .reason
                    .unwrap_or_else(|| "permission denied".to_string());
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "success": false,
                        "message": message,
                        "code": decision.code.unwrap_or_else(|| "PERMISSION_DENIED".into()),
                    })),
                )
                    .into_response()
            }
            // Distinct from RateLimited so the client UX can differ.
            AppError::Banned(message) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "success": false, "message": message, "code": "BANNED" })),
            )
                .into_response(),
            AppError::RateLimited { ms_before_next } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "success": false,
                    "message": "too many requests",
                    "code": "RATE_LIMIT",
                    "msBeforeNext": ms_before_next,
                })),
            )
                .into_response(),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "message": msg })),
            )
                .into_response(),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                Json(json!({ "success": false, "message": msg })),
            )
                .into_response(),
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl AppError {
    /// Datastore and other collaborator failures: logged in full, surfaced
    /// as a generic 500. Takes the boxed error type the repository and
    /// guard-store traits speak.
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AppError::Internal(anyhow::anyhow!(err.into()))
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::PermissionDenied(msg) => {
                AppError::PermissionDenied(PermissionDecision::deny(msg))
            }
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::Datastore(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Validation(msg) => AppError::Validation(msg),
            GuardError::Store(inner) => AppError::Internal(anyhow::anyhow!(inner)),
        }
    }
}
