use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use leptess::LepTess;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::OcrConfig;
use crate::error::{GatewayError, Result};

/// Local Tesseract engine. One `LepTess` instance is kept per language and
/// recognition runs on the blocking pool.
#[derive(Clone)]
pub struct TesseractEngine {
    engines: Arc<Mutex<HashMap<String, LepTess>>>,
    timeout: Duration,
}

fn create_tesseract(language: &str) -> Result<LepTess> {
    LepTess::new(None, language)
        .map_err(|e| GatewayError::Ocr(format!("Tesseract not available for '{language}': {e}")))
}

impl TesseractEngine {
    /// Fails when Tesseract or the default language data is missing.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let default = create_tesseract(&config.default_language)?;
        info!(language = %config.default_language, "Tesseract OCR initialized");

        let mut engines = HashMap::new();
        engines.insert(config.default_language.clone(), default);

        Ok(Self {
            engines: Arc::new(Mutex::new(engines)),
            timeout: config.timeout(),
        })
    }

    pub async fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String> {
        let bytes = image_bytes.to_vec();
        let language = language.to_string();
        let engines = Arc::clone(&self.engines);

        let task = tokio::task::spawn_blocking(move || {
            let mut engines = engines.blocking_lock();
            let lt = match engines.entry(language) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let lt = create_tesseract(entry.key())?;
                    entry.insert(lt)
                }
            };

            lt.set_image_from_mem(&bytes)
                .map_err(|e| GatewayError::Ocr(format!("Failed to set image: {e}")))?;
            lt.get_utf8_text()
                .map_err(|e| GatewayError::Ocr(format!("Failed to extract text: {e}")))
        });

        tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| {
                GatewayError::Ocr(format!(
                    "OCR operation timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| GatewayError::Internal(format!("OCR task panicked: {e}")))?
    }
}
