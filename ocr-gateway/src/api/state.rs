use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::ocr::{OcrProvider, TextRecognizer};
use crate::processing::OcrPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: OcrPipeline,
    /// Name of the recognition backend, reported by `/health`.
    pub ocr_backend: &'static str,
    pub ocr_available: bool,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrProvider, cache: ResultCache) -> Self {
        let ocr_backend = ocr.backend_name();
        let ocr_available = ocr.is_available();

        let mut state = Self::with_recognizer(config, Arc::new(ocr), cache);
        state.ocr_backend = ocr_backend;
        state.ocr_available = ocr_available;
        state
    }

    /// State around an arbitrary recognizer, reported as an available
    /// `custom` backend.
    pub fn with_recognizer(
        config: Config,
        recognizer: Arc<dyn TextRecognizer>,
        cache: ResultCache,
    ) -> Self {
        let config = Arc::new(config);
        let pipeline = OcrPipeline::new(&config, recognizer, cache);

        Self {
            config,
            pipeline,
            ocr_backend: "custom",
            ocr_available: true,
        }
    }
}
