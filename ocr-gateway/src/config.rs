use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_LANGUAGE: &str = "spa";
pub const DEFAULT_OCR_BASE_URL: &str = "https://api.ocr.space";

/// Room for the JSON keys, `language` and other fields around the image.
const BODY_ENVELOPE_SLACK: usize = 64 * 1024;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub preprocessing: PreprocessingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Provider/model selection, e.g. `ocrspace`, `ocrspace/2` or `local/tesseract`.
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_language: String,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "ocrspace".to_string(),
            api_key: None,
            base_url: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: 15,
            max_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessingConfig {
    pub max_image_bytes: usize,
    pub median_radius: u32,
    pub binarize_threshold: u8,
    pub jpeg_quality: u8,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            median_radius: 3,
            binarize_threshold: 128,
            jpeg_quality: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// `redis://...`, `memory://`, or `None` to disable caching.
    pub url: Option<String>,
    pub ttl_secs: u64,
    pub memory_capacity: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            ttl_secs: 24 * 60 * 60,
            memory_capacity: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("PORT", 5000),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or_else(|_| "ocrspace".to_string()),
                api_key: parse_env_opt("OCR_API_KEY"),
                base_url: parse_env_opt("OCR_BASE_URL"),
                default_language: env::var("OCR_LANGUAGE")
                    .unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 15),
                max_attempts: parse_env_or("OCR_MAX_ATTEMPTS", 2),
                retry_delay_ms: parse_env_or("OCR_RETRY_DELAY_MS", 1000),
            },
            preprocessing: PreprocessingConfig {
                max_image_bytes: parse_env_or("OCR_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
                median_radius: parse_env_or("OCR_MEDIAN_RADIUS", 3),
                binarize_threshold: parse_env_or("OCR_BINARIZE_THRESHOLD", 128),
                jpeg_quality: parse_env_or("OCR_JPEG_QUALITY", 90),
            },
            cache: CacheConfig {
                url: parse_env_opt("CACHE_URL").or_else(|| parse_env_opt("REDIS_URL")),
                ttl_secs: parse_env_or("CACHE_TTL_SECS", 24 * 60 * 60),
                memory_capacity: parse_env_or("CACHE_MEMORY_CAPACITY", 1024),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Largest request body that can still carry a `max_image_bytes` image
    /// as base64 inside the JSON envelope.
    ///
    /// Line-wrapped base64 (76 columns, each `\r\n` escaped to four bytes in
    /// JSON) grows by about 5%, so the slack scales with the payload.
    pub fn max_body_bytes(&self) -> usize {
        let encoded = self.preprocessing.max_image_bytes.div_ceil(3).saturating_mul(4);
        encoded
            .saturating_add(encoded / 10)
            .saturating_add(BODY_ENVELOPE_SLACK)
    }
}

/// Split an `OCR_MODEL` value into `(provider, variant)`.
pub fn parse_provider_model(model: &str) -> (String, Option<&str>) {
    match model.split_once('/') {
        Some((provider, rest)) => (provider.trim().to_lowercase(), Some(rest.trim())),
        None => (model.trim().to_lowercase(), None),
    }
}
