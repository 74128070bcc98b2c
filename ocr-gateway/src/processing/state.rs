//! Per-request state machine.
//!
//! [`transition`] is a pure function from the current [`Stage`] and the
//! [`Event`] its effect produced to the next stage. The driver in
//! `pipeline.rs` performs the effects; nothing here touches the network.
//!
//! ```text
//! Validating → CacheCheck → Preprocessing → Recognizing → PostProcessing → Caching → Done
//!                  └──── hit ───────────────────────────────────────────────────────→ Done
//! any stage ── Failed ──→ Error
//! ```

use std::fmt;

use crate::cache::Fingerprint;
use crate::error::GatewayError;

/// Inbound request as received from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct OcrRequest {
    pub image_base64: String,
    pub language: Option<String>,
}

/// Terminal result of one pipeline run.
#[derive(Debug)]
pub enum OcrOutcome {
    Text(String),
    CachedText(String),
    Error(GatewayError),
}

impl OcrOutcome {
    /// `(text, served_from_cache)` on success.
    pub fn into_result(self) -> Result<(String, bool), GatewayError> {
        match self {
            OcrOutcome::Text(text) => Ok((text, false)),
            OcrOutcome::CachedText(text) => Ok((text, true)),
            OcrOutcome::Error(e) => Err(e),
        }
    }
}

#[derive(Debug)]
pub enum Stage {
    Validating(OcrRequest),
    CacheCheck {
        image: Vec<u8>,
        language: String,
    },
    Preprocessing {
        fingerprint: Fingerprint,
        image: Vec<u8>,
        language: String,
    },
    Recognizing {
        fingerprint: Fingerprint,
        prepared: Vec<u8>,
        language: String,
    },
    PostProcessing {
        fingerprint: Fingerprint,
        raw_text: String,
    },
    Caching {
        fingerprint: Fingerprint,
        text: String,
    },
    Done {
        text: String,
        cached: bool,
    },
    Error(GatewayError),
}

#[derive(Debug)]
pub enum Event {
    Validated { image: Vec<u8>, language: String },
    CacheChecked { fingerprint: Fingerprint, hit: Option<String> },
    Preprocessed(Vec<u8>),
    Recognized(String),
    PostProcessed(String),
    Stored,
    Failed(GatewayError),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done { .. } | Stage::Error(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Validating(_) => "validating",
            Stage::CacheCheck { .. } => "cache_check",
            Stage::Preprocessing { .. } => "preprocessing",
            Stage::Recognizing { .. } => "recognizing",
            Stage::PostProcessing { .. } => "post_processing",
            Stage::Caching { .. } => "caching",
            Stage::Done { .. } => "done",
            Stage::Error(_) => "error",
        }
    }

    /// Only meaningful for terminal stages; anything else is reported as an
    /// internal error.
    pub fn into_outcome(self) -> OcrOutcome {
        match self {
            Stage::Done { text, cached: true } => OcrOutcome::CachedText(text),
            Stage::Done { text, cached: false } => OcrOutcome::Text(text),
            Stage::Error(e) => OcrOutcome::Error(e),
            other => OcrOutcome::Error(GatewayError::Internal(format!(
                "pipeline stopped in non-terminal stage '{}'",
                other.name()
            ))),
        }
    }
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Validated { .. } => "validated",
            Event::CacheChecked { .. } => "cache_checked",
            Event::Preprocessed(_) => "preprocessed",
            Event::Recognized(_) => "recognized",
            Event::PostProcessed(_) => "post_processed",
            Event::Stored => "stored",
            Event::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn transition(stage: Stage, event: Event) -> Stage {
    match (stage, event) {
        // Terminal stages absorb everything.
        (stage @ (Stage::Done { .. } | Stage::Error(_)), _) => stage,

        (_, Event::Failed(e)) => Stage::Error(e),

        (Stage::Validating(_), Event::Validated { image, language }) => {
            Stage::CacheCheck { image, language }
        }

        (Stage::CacheCheck { image, language }, Event::CacheChecked { fingerprint, hit }) => {
            match hit {
                Some(text) => Stage::Done { text, cached: true },
                None => Stage::Preprocessing {
                    fingerprint,
                    image,
                    language,
                },
            }
        }

        (
            Stage::Preprocessing {
                fingerprint,
                language,
                ..
            },
            Event::Preprocessed(prepared),
        ) => Stage::Recognizing {
            fingerprint,
            prepared,
            language,
        },

        (Stage::Recognizing { fingerprint, .. }, Event::Recognized(raw_text)) => {
            Stage::PostProcessing {
                fingerprint,
                raw_text,
            }
        }

        (Stage::PostProcessing { fingerprint, .. }, Event::PostProcessed(text)) => {
            Stage::Caching { fingerprint, text }
        }

        (Stage::Caching { text, .. }, Event::Stored) => Stage::Done {
            text,
            cached: false,
        },

        (stage, event) => Stage::Error(GatewayError::Internal(format!(
            "unexpected event '{}' in stage '{}'",
            event.name(),
            stage.name()
        ))),
    }
}
