use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Coarse failure classes used to decide status codes and caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller. Never retried, never cached.
    ClientInput,
    /// The OCR provider failed or could not be reached.
    Provider,
    /// Anything else.
    Internal,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No base64 image was received")]
    MissingImage,

    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    #[error("Image too large: {size} bytes exceeds the {max} byte limit")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Remote OCR unavailable: {0}")]
    RemoteOcrUnavailable(String),

    #[error("OCR provider returned an unusable response: {0}")]
    ProviderResponse(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::MissingImage
            | GatewayError::InvalidEncoding(_)
            | GatewayError::ImageTooLarge { .. }
            | GatewayError::InvalidImage(_)
            | GatewayError::InvalidRequest(_)
            | GatewayError::PayloadTooLarge(_) => ErrorKind::ClientInput,
            GatewayError::RemoteOcrUnavailable(_) | GatewayError::ProviderResponse(_) => {
                ErrorKind::Provider
            }
            GatewayError::Ocr(_)
            | GatewayError::OcrUnavailable(_)
            | GatewayError::Cache(_)
            | GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ImageTooLarge { .. } | GatewayError::PayloadTooLarge(_) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            GatewayError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => match self.kind() {
                ErrorKind::ClientInput => StatusCode::BAD_REQUEST,
                ErrorKind::Provider => StatusCode::BAD_GATEWAY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
