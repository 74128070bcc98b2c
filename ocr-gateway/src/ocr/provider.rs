use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{parse_provider_model, OcrConfig};
use crate::error::{GatewayError, Result};

use super::api::OcrSpaceClient;
#[cfg(feature = "local-ocr")]
use super::tesseract::TesseractEngine;

/// Anything that turns an encoded image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String>;
}

#[derive(Clone)]
enum OcrBackend {
    Remote {
        client: OcrSpaceClient,
    },
    #[cfg(feature = "local-ocr")]
    Local {
        engine: TesseractEngine,
    },
    Unavailable {
        reason: String,
    },
}

/// OCR engine selected from `OCR_MODEL`.
///
/// - `ocrspace` or `ocrspace/<engine>`: remote API, needs `OCR_API_KEY`
/// - `local/tesseract`: Tesseract, needs the `local-ocr` feature
///
/// A provider that cannot be set up is kept as unavailable so the server
/// still starts; recognition then fails with `OcrUnavailable`.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let (provider, variant) = parse_provider_model(&config.model);

        let backend = match provider.as_str() {
            "ocrspace" => match OcrSpaceClient::new(config, variant) {
                Ok(client) => {
                    info!(base_url = client.base_url(), "Remote OCR backend initialized");
                    OcrBackend::Remote { client }
                }
                Err(e) => unavailable(format!("Remote OCR backend unavailable: {e}")),
            },
            "local" => local_backend(config),
            other => unavailable(format!("Unknown OCR provider '{other}'")),
        };

        Self { backend }
    }

    pub fn from_client(client: OcrSpaceClient) -> Self {
        Self {
            backend: OcrBackend::Remote { client },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            OcrBackend::Remote { .. } => "ocrspace",
            #[cfg(feature = "local-ocr")]
            OcrBackend::Local { .. } => "tesseract",
            OcrBackend::Unavailable { .. } => "unavailable",
        }
    }
}

fn unavailable(reason: String) -> OcrBackend {
    warn!("{}", reason);
    OcrBackend::Unavailable { reason }
}

#[cfg(feature = "local-ocr")]
fn local_backend(config: &OcrConfig) -> OcrBackend {
    match TesseractEngine::new(config) {
        Ok(engine) => OcrBackend::Local { engine },
        Err(e) => unavailable(e.to_string()),
    }
}

#[cfg(not(feature = "local-ocr"))]
fn local_backend(_config: &OcrConfig) -> OcrBackend {
    unavailable("Local OCR requires building with the `local-ocr` feature".to_string())
}

#[async_trait]
impl TextRecognizer for OcrProvider {
    async fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String> {
        match &self.backend {
            OcrBackend::Remote { client } => client.recognize(image_bytes, language).await,
            #[cfg(feature = "local-ocr")]
            OcrBackend::Local { engine } => engine.recognize(image_bytes, language).await,
            OcrBackend::Unavailable { reason } => {
                Err(GatewayError::OcrUnavailable(reason.clone()))
            }
        }
    }
}
