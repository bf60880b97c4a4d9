//! HTTP error mapping for the REST adapter.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use comments_core::error::CommentsError;

/// Wraps `CommentsError` so handlers can return `Result<_, AppError>` and use `?`.
#[derive(Debug)]
pub struct AppError(pub CommentsError);

impl From<CommentsError> for AppError {
    fn from(e: CommentsError) -> Self {
        Self(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Client-facing message. Store failures are never echoed back.
    pub fn message(&self) -> String {
        match &self.0 {
            CommentsError::Persistence(_) => "Internal server error".to_string(),
            CommentsError::NotFound(what) => format!("Not found: {what}"),
            CommentsError::InvalidInput(msg)
            | CommentsError::Conflict(msg)
            | CommentsError::Unauthenticated(msg) => msg.clone(),
            CommentsError::PermissionDenied(reason) => reason.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            CommentsError::Persistence(e) => tracing::error!(error = %e, "persistence failure"),
            other => tracing::debug!(status = status.as_u16(), error = %other, "request rejected"),
        }

        let body = Json(serde_json::json!({ "error": self.message() }));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
