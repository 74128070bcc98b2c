use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::extractors::AppJson;
use crate::api::state::AppState;
use crate::error::{GatewayError, Result};
use crate::processing::OcrRequest;

pub const LIVENESS_TEXT: &str = "OCR service is running. Send images with POST /ocr.";

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OcrRequestBody {
    /// Base64-encoded image. A `data:<mime>;base64,` prefix is accepted.
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Language code passed to the OCR engine. Defaults to `OCR_LANGUAGE`.
    #[serde(default)]
    #[schema(example = "spa")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OcrResponse {
    pub text: String,
    /// Present, and `true`, only when the text came from the result cache.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ocr: OcrStatus,
    pub cache: CacheStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrStatus {
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheStatus {
    pub enabled: bool,
    pub backend: String,
}

/// `POST /ocr`
#[utoipa::path(
    post,
    path = "/ocr",
    tag = "ocr",
    request_body = OcrRequestBody,
    responses(
        (status = 200, description = "Recognized text", body = OcrResponse),
        (status = 400, description = "Missing, malformed or undecodable image", body = ErrorBody),
        (status = 413, description = "Image exceeds the size limit", body = ErrorBody),
        (status = 502, description = "OCR provider failed", body = ErrorBody),
        (status = 503, description = "No OCR backend configured", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    AppJson(body): AppJson<OcrRequestBody>,
) -> Result<Json<OcrResponse>> {
    let image_base64 = body.image_base64.ok_or(GatewayError::MissingImage)?;

    let (text, cached) = state
        .pipeline
        .run(OcrRequest {
            image_base64,
            language: body.language,
        })
        .await
        .into_result()?;

    Ok(Json(OcrResponse { text, cached }))
}

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Liveness text", body = String, content_type = "text/plain"))
)]
pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service health status", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.pipeline.cache();
    let status = if state.ocr_available { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr: OcrStatus {
            status: if state.ocr_available { "ok" } else { "unavailable" }.to_string(),
            backend: state.ocr_backend.to_string(),
        },
        cache: CacheStatus {
            enabled: cache.is_enabled(),
            backend: cache.backend_name().to_string(),
        },
    })
}
