//! Mapping of crate errors onto HTTP responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::NoteboxError;

/// JSON body of error responses and of the delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl NoteboxError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            NoteboxError::Validation(_) => StatusCode::BAD_REQUEST,
            NoteboxError::NotFound(_) => StatusCode::NOT_FOUND,
            NoteboxError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            NoteboxError::Storage(_)
            | NoteboxError::Internal(_)
            | NoteboxError::Config(_)
            | NoteboxError::Io(_)
            | NoteboxError::Json(_)
            | NoteboxError::Yaml(_)
            | NoteboxError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NoteboxError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // internal details stay in the log
        let message = match &self {
            NoteboxError::Validation(detail) => detail.clone(),
            NoteboxError::NotFound(_) => "Note not found".to_string(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(MessageBody::new(message))).into_response();

        if let NoteboxError::RateLimited {
            retry_after_secs: Some(secs),
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
