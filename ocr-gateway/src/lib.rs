//! Image-to-text gateway.
//!
//! A base64 image arrives on `POST /ocr`, is normalized for recognition,
//! sent to the configured OCR backend and answered with the cleaned text.
//! Results are cached by a fingerprint of the original bytes and language.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod ocr;
pub mod processing;
pub mod retry;
