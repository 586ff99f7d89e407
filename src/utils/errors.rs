//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Petición corregible por el usuario: fecha inválida, reserva en el pasado, duración <= 0
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// La hora pedida no aparece en el recálculo de disponibilidad
    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    /// Otra clase aprobada ocupa ya la misma hora de inicio
    #[error("Approval conflict: {0}")]
    ConflictDuringApproval(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl AppError {
    /// Código estable que los clientes usan para distinguir los errores
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::SlotUnavailable(_) => "SLOT_UNAVAILABLE",
            AppError::ConflictDuringApproval(_) => "APPROVAL_CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SlotUnavailable(_) | AppError::ConflictDuringApproval(_) => {
                StatusCode::CONFLICT
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = Some(self.code().to_string());

        let error_response = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ErrorResponse {
                    error: "Database Error".to_string(),
                    message: "An error occurred while accessing the database".to_string(),
                    details: Some(json!({ "sql_error": e.to_string() })),
                    code,
                }
            }

            AppError::Validation(e) => {
                tracing::debug!("Validation error: {}", e);
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code,
                }
            }

            AppError::InvalidRequest(msg) => {
                tracing::debug!("Invalid request: {}", msg);
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::SlotUnavailable(msg) => {
                tracing::debug!("Slot unavailable: {}", msg);
                ErrorResponse {
                    error: "Slot Unavailable".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::ConflictDuringApproval(msg) => {
                tracing::debug!("Approval conflict: {}", msg);
                ErrorResponse {
                    error: "Approval Conflict".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                ErrorResponse {
                    error: "Unauthorized".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden access: {}", msg);
                ErrorResponse {
                    error: "Forbidden".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::NotFound(msg) => {
                tracing::debug!("Resource not found: {}", msg);
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: Some(json!({ "internal_error": msg })),
                    code,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn invalid_request(message: &str) -> AppError {
    AppError::InvalidRequest(message.to_string())
}

/// Función helper para rechazar una hora que ya no está disponible
pub fn slot_unavailable() -> AppError {
    AppError::SlotUnavailable("This hour is not available.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_and_approval_errors_are_distinct() {
        let slot = slot_unavailable();
        let approval = AppError::ConflictDuringApproval("busy".to_string());

        assert_eq!(slot.status(), StatusCode::CONFLICT);
        assert_eq!(approval.status(), StatusCode::CONFLICT);
        assert_ne!(slot.code(), approval.code());
    }

    #[test]
    fn test_invalid_request_is_bad_request() {
        let error = invalid_request("Date is not valid.");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Invalid request: Date is not valid.");
    }
}
