use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use repairdesk_shared::ValidationErrors;
use repairdesk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Upload too large (max {max} bytes)")]
    UploadTooLarge { max: usize },

    #[error("Attachment storage error: {0}")]
    AttachmentStorage(String),

    #[error("Record storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read submissions: {0}")]
    ReadSubmissions(StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(errors) => {
                let body = serde_json::json!({ "errors": errors.messages() });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            ServerError::InvalidApiKey => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::UploadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::ReadSubmissions(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read submissions".to_string(),
            ),
            ServerError::AttachmentStorage(_) | ServerError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
