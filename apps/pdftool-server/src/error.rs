//! Error types for the pdftool server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftool_core::PdfToolError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    PageOutOfRange(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Incorrect password")]
    AuthenticationFailed,

    #[error("Processing timeout after {0}ms")]
    Timeout(u64),

    #[error("Unreadable input: {0}")]
    UnreadableInput(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Conversion service is not configured")]
    ConversionUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_)
            | ServerError::PageOutOfRange(_)
            | ServerError::InvalidDimensions(_) => StatusCode::BAD_REQUEST,
            ServerError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ServerError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ServerError::UnreadableInput(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::ConversionFailed(_) => StatusCode::BAD_GATEWAY,
            ServerError::ConversionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::PageOutOfRange(_) => "PAGE_OUT_OF_RANGE",
            ServerError::InvalidDimensions(_) => "INVALID_DIMENSIONS",
            ServerError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ServerError::Timeout(_) => "TIMEOUT",
            ServerError::UnreadableInput(_) => "UNREADABLE_INPUT",
            ServerError::ConversionFailed(_) => "CONVERSION_FAILED",
            ServerError::ConversionUnavailable => "CONVERSION_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PdfToolError> for ServerError {
    fn from(err: PdfToolError) -> Self {
        match err {
            PdfToolError::ParseError(_) | PdfToolError::Encrypted | PdfToolError::ImageError(_) => {
                ServerError::UnreadableInput(err.to_string())
            }
            PdfToolError::AuthenticationFailed => ServerError::AuthenticationFailed,
            PdfToolError::InvalidDimensions(msg) => ServerError::InvalidDimensions(msg),
            PdfToolError::ZeroSizedPage(_) => ServerError::InvalidDimensions(err.to_string()),
            PdfToolError::PageOutOfRange { .. } => ServerError::PageOutOfRange(err.to_string()),
            PdfToolError::InvalidEdit(_)
            | PdfToolError::UnsupportedText(_)
            | PdfToolError::NoDocuments => ServerError::InvalidRequest(err.to_string()),
            PdfToolError::OperationError(_) | PdfToolError::SerializationError(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_codes() {
        let cases = [
            (PdfToolError::ParseError("bad".into()), "UNREADABLE_INPUT", 500),
            (PdfToolError::AuthenticationFailed, "AUTHENTICATION_FAILED", 401),
            (
                PdfToolError::PageOutOfRange {
                    index: 3,
                    page_count: 1,
                },
                "PAGE_OUT_OF_RANGE",
                400,
            ),
            (PdfToolError::InvalidDimensions("0 x 0".into()), "INVALID_DIMENSIONS", 400),
            (PdfToolError::NoDocuments, "INVALID_REQUEST", 400),
            (PdfToolError::UnsupportedText("☃".into()), "INVALID_REQUEST", 400),
            (PdfToolError::SerializationError("io".into()), "INTERNAL_ERROR", 500),
        ];
        for (core, code, status) in cases {
            let err = ServerError::from(core);
            assert_eq!(err.code(), code);
            assert_eq!(err.status().as_u16(), status);
        }
    }
}
