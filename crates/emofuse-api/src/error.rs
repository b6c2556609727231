//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emofuse_media::MediaError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No face detected")]
    NoFace,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFace => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Media(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            ApiError::Media(MediaError::Timeout(..)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoFace => "no_face",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Internal(_) => "internal",
            ApiError::Media(e) => match e {
                MediaError::InvalidImage(_) => "invalid_image",
                MediaError::InvalidAudio(_) => "invalid_audio",
                MediaError::Timeout(..) => "timeout",
                MediaError::ClassificationFailed { .. } => "classification_failed",
                _ => "internal",
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(format!("Malformed multipart upload: {}", err.body_text()))
        }
    }
}

/// Response extension marking a body whose detail exposes internals.
///
/// [`crate::middleware::redact_internal_errors`] swaps such bodies for
/// [`redacted_response`] in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalErrorCode(pub &'static str);

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

/// Generic body for an internal error.
pub fn redacted_response(status: StatusCode, code: &'static str) -> Response {
    let body = ErrorResponse {
        detail: "An internal error occurred".to_string(),
        code,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = ErrorResponse {
            detail: self.to_string(),
            code,
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_internal() {
            response.extensions_mut().insert(InternalErrorCode(code));
        }
        response
    }
}
