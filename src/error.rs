//! Error handling
//!
//! One taxonomy for the HTTP surface. External-source failures never reach
//! this type: the engine converts them to `Unavailable` values and records
//! them in the verdict's `apis_consulted` map.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Malformed input URL (length, scheme, parse)
    InvalidUrl(String),

    /// SSRF-hazardous target rejected by the safety gate
    BlockedTarget(String),

    /// Client exceeded the per-IP token bucket
    RateLimited,

    /// Request body failed validation
    ValidationError(String),

    /// Resource not found
    NotFound(String),

    /// Database errors (storage fallback should normally absorb these)
    DatabaseError(String),

    /// Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidUrl(msg) => (StatusCode::BAD_REQUEST, format!("URL invalida: {msg}")),
            AppError::BlockedTarget(msg) => {
                (StatusCode::BAD_REQUEST, format!("URL bloqueada: {msg}"))
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Demasiadas solicitudes. Intente de nuevo en un minuto.".to_string(),
            ),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error de base de datos".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<crate::logic::safety::SafetyError> for AppError {
    fn from(err: crate::logic::safety::SafetyError) -> Self {
        use crate::logic::safety::SafetyError;
        match err {
            SafetyError::BlockedTarget(msg) => AppError::BlockedTarget(msg),
            other => AppError::InvalidUrl(other.to_string()),
        }
    }
}
