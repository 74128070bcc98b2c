mod extractors;
mod handlers;
mod openapi;
mod routes;
mod state;

pub use handlers::{HealthResponse, OcrRequestBody, OcrResponse, LIVENESS_TEXT};
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
