use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

// Convert from core errors; the fixed-plan conflict keeps its distinct
// status so callers can treat it as already-handled.
impl From<hoshimi_core::CoreError> for AppError {
    fn from(err: hoshimi_core::CoreError) -> Self {
        use hoshimi_core::CoreError;
        match err {
            CoreError::NotFound => Self::not_found("not found"),
            CoreError::PlanFixed(date) => Self::conflict(format!("plan for {date} is fixed")),
            CoreError::Database(e) => Self::internal(format!("database error: {e}")),
            CoreError::InvalidRecord(msg) => Self::internal(format!("invalid stored record: {msg}")),
            CoreError::Notify(msg) => Self::internal(format!("notification error: {msg}")),
        }
    }
}
