use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{OcrConfig, DEFAULT_OCR_BASE_URL};
use crate::error::{GatewayError, Result};
use crate::retry::{Attempt, RetryPolicy, Sleeper, TokioSleeper};

const PARSE_PATH: &str = "/parse/image";
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

/// Client for an OCR.space-compatible `/parse/image` endpoint.
///
/// The image travels as a `data:image/jpeg;base64,...` form field and the
/// API key as the `apikey` header. Failed attempts (transport errors,
/// timeouts, non-200 statuses) are retried under the configured
/// [`RetryPolicy`]; a 200 whose body cannot be used is not retried.
#[derive(Clone)]
pub struct OcrSpaceClient {
    client: Client,
    api_key: String,
    base_url: String,
    engine: Option<String>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for OcrSpaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrSpaceClient")
            .field("base_url", &self.base_url)
            .field("engine", &self.engine)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl OcrSpaceClient {
    pub fn new(config: &OcrConfig, engine: Option<&str>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GatewayError::Ocr("API key required for remote OCR".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OCR_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            engine: engine.filter(|e| !e.is_empty()).map(str::to_string),
            retry: RetryPolicy::new(config.max_attempts, config.retry_delay()),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Recognize text in an encoded image. An image with no detectable text
    /// yields an empty string.
    pub async fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String> {
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(image_bytes));

        let mut form = vec![
            ("base64Image", data_url),
            ("language", language.to_string()),
            ("isOverlayRequired", "false".to_string()),
        ];
        if let Some(engine) = &self.engine {
            form.push(("OCREngine", engine.clone()));
        }

        let max_attempts = self.retry.max_attempts;
        let text = self
            .retry
            .run(self.sleeper.as_ref(), |attempt| self.attempt(&form, attempt))
            .await
            .map_err(|e| match e {
                GatewayError::RemoteOcrUnavailable(msg) => GatewayError::RemoteOcrUnavailable(
                    format!("{msg} (after {max_attempts} attempts)"),
                ),
                other => other,
            })?;

        info!(language, chars = text.len(), "Remote OCR completed");
        Ok(text)
    }

    async fn attempt(
        &self,
        form: &[(&str, String)],
        attempt: u32,
    ) -> Attempt<String, GatewayError> {
        debug!(attempt, "Sending OCR request");

        let response = match self
            .client
            .post(format!("{}{PARSE_PATH}", self.base_url))
            .header("apikey", &self.api_key)
            .form(form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return Attempt::Retry(transport_error(&e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Retry(GatewayError::RemoteOcrUnavailable(format!(
                "provider returned {status}: {}",
                truncate(&body)
            )));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retry(transport_error(&e)),
        };

        match serde_json::from_slice::<ParseResponse>(&body) {
            Ok(parsed) => match extract_text(parsed) {
                Ok(text) => Attempt::Done(text),
                Err(e) => Attempt::Abort(e),
            },
            Err(e) => Attempt::Abort(GatewayError::ProviderResponse(format!(
                "Failed to parse response: {e}"
            ))),
        }
    }
}

fn transport_error(e: &reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::RemoteOcrUnavailable("request timed out".to_string())
    } else {
        GatewayError::RemoteOcrUnavailable(format!("request failed: {e}"))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

fn extract_text(response: ParseResponse) -> Result<String> {
    if response.is_errored_on_processing {
        return Err(GatewayError::ProviderResponse(error_message(
            response.error_message.as_ref(),
        )));
    }

    Ok(response
        .parsed_results
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|r| r.parsed_text)
        .unwrap_or_default())
}

/// `ErrorMessage` arrives as either a string or a list of strings.
fn error_message(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => "provider reported a processing error".to_string(),
    }
}
