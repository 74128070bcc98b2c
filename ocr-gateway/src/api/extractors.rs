use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;

use crate::error::GatewayError;

/// `axum::Json` whose rejections render as [`GatewayError`] bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(GatewayError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> GatewayError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            GatewayError::InvalidRequest(format!("Invalid JSON: {}", err.body_text()))
        }
        JsonRejection::JsonSyntaxError(err) => {
            GatewayError::InvalidRequest(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => GatewayError::InvalidRequest(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(err) => {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                GatewayError::PayloadTooLarge(err.body_text())
            } else {
                GatewayError::InvalidRequest(format!("Failed to read request body: {}", err.body_text()))
            }
        }
        other => GatewayError::InvalidRequest(other.body_text()),
    }
}
