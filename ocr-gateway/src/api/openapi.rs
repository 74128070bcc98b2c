use axum::Json;
use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OCR Gateway API",
        description = "Image-to-text gateway with preprocessing and a shared result cache.",
    ),
    paths(
        handlers::recognize,
        handlers::liveness,
        handlers::health_check,
    ),
    components(schemas(
        handlers::OcrRequestBody,
        handlers::OcrResponse,
        handlers::ErrorBody,
        handlers::HealthResponse,
        handlers::OcrStatus,
        handlers::CacheStatus,
    )),
    tags(
        (name = "ocr", description = "Text recognition"),
        (name = "health", description = "Liveness and health checks"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
