use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use satellite_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Two response shapes exist. A missing handler or a malformed request is
/// reported as JSON `{ "error", "code" }`. Failures raised by a handler
/// itself are returned as the bare error text, which the orchestrator shows
/// to the requester unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A task runtime error. Validation failures map to 400, everything else
    /// the handler raised to 500.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure while planning or reading a resource. Always a 400 unless the
    /// handler itself does not exist.
    #[error(transparent)]
    Resource(CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn resource(err: impl Into<CoreError>) -> Self {
        AppError::Resource(err.into())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Core(CoreError::NotFound { entity, id })
            | AppError::Resource(CoreError::NotFound { entity, id }) => json_error(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} not found: {id}"),
            ),
            AppError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Resource(err) => {
                tracing::warn!(error = %err, "Resource handler failed");
                (StatusCode::BAD_REQUEST, err.to_string()).into_response()
            }
            AppError::Core(err) => {
                let status = classify_core_error(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "Task handler failed");
                } else {
                    tracing::warn!(error = %err, "Task request rejected");
                }
                (status, err.to_string()).into_response()
            }
        }
    }
}

/// Status for a task-side [`CoreError`] returned as plain text.
fn classify_core_error(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Validation(_) | CoreError::Plan(_) => StatusCode::BAD_REQUEST,
        CoreError::Remote(_) | CoreError::Process(_) | CoreError::Handler(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn json_error(status: StatusCode, code: &str, message: String) -> Response {
    let body = json!({
        "error": message,
        "code": code,
    });
    (status, axum::Json(body)).into_response()
}
