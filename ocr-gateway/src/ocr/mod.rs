//! OCR (Optical Character Recognition) Module
//!
//! Turns images into text for the request pipeline.
//!
//! # Architecture
//!
//! - `ImagePreprocessor` normalizes raw images (luminance, median smoothing,
//!   global threshold, JPEG re-encode) before recognition
//! - `TextRecognizer` is the seam the pipeline calls through
//! - `OcrProvider` implements it, dispatching to a remote OCR.space-style API
//!   (`OcrSpaceClient`) or to local Tesseract (`local-ocr` feature)
//!
//! # Configuration
//!
//! OCR behavior is controlled via `OcrConfig` and `PreprocessingConfig`
//! (see `config.rs`):
//! - `model`: provider selection (`ocrspace`, `ocrspace/2`, `local/tesseract`)
//! - `api_key`: credential for the remote provider
//! - `timeout_secs`: per-attempt timeout
//! - `max_attempts` / `retry_delay_ms`: bounded retry with a fixed delay
//! - `max_image_bytes`: upper bound on decoded input size

mod api;
mod preprocessing;
mod provider;
#[cfg(feature = "local-ocr")]
mod tesseract;

pub use api::OcrSpaceClient;
pub use preprocessing::{binarize, median_filter, ImageOps, ImagePreprocessor, StandardImageOps};
pub use provider::{OcrProvider, TextRecognizer};
#[cfg(feature = "local-ocr")]
pub use tesseract::TesseractEngine;
