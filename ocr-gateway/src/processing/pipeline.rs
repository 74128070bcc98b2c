use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, ResultCache};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::ocr::{ImagePreprocessor, TextRecognizer};

use super::state::{transition, Event, OcrOutcome, OcrRequest, Stage};
use super::text::normalize_text;

/// Standard alphabet, padding optional.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const MAX_LANGUAGE_LEN: usize = 32;

/// Drives one request through the stages in [`super::state`].
///
/// Each loop iteration performs the side effect belonging to the current
/// stage (decode, cache lookup, preprocessing, recognition, cache store) and
/// feeds the resulting event back into [`transition`].
#[derive(Clone)]
pub struct OcrPipeline {
    preprocessor: ImagePreprocessor,
    recognizer: Arc<dyn TextRecognizer>,
    cache: ResultCache,
    cache_ttl: Duration,
    default_language: String,
}

impl OcrPipeline {
    pub fn new(config: &Config, recognizer: Arc<dyn TextRecognizer>, cache: ResultCache) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(&config.preprocessing),
            recognizer,
            cache,
            cache_ttl: config.cache.ttl(),
            default_language: config.ocr.default_language.trim().to_lowercase(),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub async fn run(&self, request: OcrRequest) -> OcrOutcome {
        let started = Instant::now();
        let mut stage = Stage::Validating(request);

        while !stage.is_terminal() {
            let event = self.execute(&stage).await;
            let from = stage.name();
            stage = transition(stage, event);
            debug!(from, to = stage.name(), "Pipeline transition");
        }

        let outcome = stage.into_outcome();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            OcrOutcome::Text(text) => {
                info!(elapsed_ms, chars = text.len(), cached = false, "OCR request completed")
            }
            OcrOutcome::CachedText(text) => {
                info!(elapsed_ms, chars = text.len(), cached = true, "OCR request completed")
            }
            OcrOutcome::Error(e) => warn!(elapsed_ms, kind = ?e.kind(), "OCR request failed: {}", e),
        }
        outcome
    }

    async fn execute(&self, stage: &Stage) -> Event {
        match stage {
            Stage::Validating(request) => match self.validate(request) {
                Ok((image, language)) => Event::Validated { image, language },
                Err(e) => Event::Failed(e),
            },
            Stage::CacheCheck { image, language } => {
                let fingerprint = Fingerprint::compute(image, language);
                let hit = self.cache.get(&fingerprint).await;
                debug!(%fingerprint, hit = hit.is_some(), "Cache checked");
                Event::CacheChecked { fingerprint, hit }
            }
            Stage::Preprocessing { image, .. } => match self.preprocess(image).await {
                Ok(prepared) => Event::Preprocessed(prepared),
                Err(e) => Event::Failed(e),
            },
            Stage::Recognizing {
                prepared, language, ..
            } => match self.recognizer.recognize(prepared, language).await {
                Ok(raw) => Event::Recognized(raw),
                Err(e) => Event::Failed(e),
            },
            Stage::PostProcessing { raw_text, .. } => {
                Event::PostProcessed(normalize_text(raw_text))
            }
            Stage::Caching { fingerprint, text } => {
                self.cache.set(fingerprint, text, self.cache_ttl).await;
                Event::Stored
            }
            Stage::Done { .. } | Stage::Error(_) => Event::Failed(GatewayError::Internal(
                "terminal stage has no effect".to_string(),
            )),
        }
    }

    fn validate(&self, request: &OcrRequest) -> Result<(Vec<u8>, String)> {
        let image = decode_image(&request.image_base64)?;
        let language = resolve_language(request.language.as_deref(), &self.default_language)?;
        Ok((image, language))
    }

    /// Image decoding and filtering are CPU-bound, so they run off the
    /// async workers.
    async fn preprocess(&self, image: &[u8]) -> Result<Vec<u8>> {
        self.preprocessor.check_size(image)?;

        let preprocessor = self.preprocessor.clone();
        let image = image.to_vec();
        tokio::task::spawn_blocking(move || preprocessor.normalize(&image))
            .await
            .map_err(|e| GatewayError::Internal(format!("Preprocessing task failed: {e}")))?
    }
}

/// Decode the request's base64 payload. Accepts an optional
/// `data:<mime>;base64,` prefix and embedded whitespace.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.trim_start().strip_prefix("data:") {
        Some(uri) => uri
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| GatewayError::InvalidEncoding("data URI has no payload".to_string()))?,
        None => encoded,
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(GatewayError::MissingImage);
    }

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| GatewayError::InvalidEncoding(e.to_string()))?;
    if bytes.is_empty() {
        return Err(GatewayError::MissingImage);
    }
    Ok(bytes)
}

/// Normalize a requested language code, falling back to `default` when the
/// field is absent or blank. Codes are lowercased, so `SPA` and `spa` share
/// cache entries.
pub fn resolve_language(requested: Option<&str>, default: &str) -> Result<String> {
    let language = requested
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(default)
        .to_lowercase();

    let valid = !language.is_empty()
        && language.len() <= MAX_LANGUAGE_LEN
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
    if !valid {
        return Err(GatewayError::InvalidRequest(format!(
            "Unsupported language code '{language}'"
        )));
    }
    Ok(language)
}
