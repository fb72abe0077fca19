//! kvgate REST API Handlers
//!
//! Each handler performs exactly one registry operation.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kvgate::{ErrorCode, ErrorResponse, KeyRequest, KeyValue, MessageResponse, Snapshot};
use tracing::info;

use crate::registry::{Registry, RegistryError};

// ==================== Error Handling ====================

pub struct ApiError(pub StatusCode, pub Json<ErrorResponse>);

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError(
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: msg.into(),
                code: ErrorCode::NotFound,
            }),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(
            rejection.status(),
            Json(ErrorResponse {
                error: rejection.body_text(),
                code: ErrorCode::BadRequest,
            }),
        )
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match &e {
            RegistryError::NotFound(_) => ApiError::not_found(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ==================== Health Check ====================

pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ==================== Registry Handlers ====================

/// Insert or overwrite a key
pub async fn upload(
    State(registry): State<Registry>,
    request: Result<Json<KeyValue>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = request?;
    let message = format!(
        "Key '{}' updated with value '{}'.",
        request.key, request.value
    );
    registry.set(request.key, request.value);

    Ok(Json(MessageResponse { message }))
}

/// Full snapshot of the registry
pub async fn get_all(State(registry): State<Registry>) -> Json<Snapshot> {
    Json(registry.get_all())
}

/// Delete a key, 404 if it is absent
pub async fn delete(
    State(registry): State<Registry>,
    request: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = request?;
    registry.delete(&request.key)?;
    info!("Deleted key '{}'", request.key);

    Ok(Json(MessageResponse {
        message: format!("Key '{}' deleted.", request.key),
    }))
}
