//! Request processing: base64 image in, normalized text out.
//!
//! A request moves through validation, cache lookup, preprocessing,
//! recognition, text cleanup and cache store. The stage graph lives in
//! `state.rs` as a pure transition function; `pipeline.rs` performs the
//! side effects for each stage.

mod pipeline;
mod state;
mod text;

pub use pipeline::{decode_image, resolve_language, OcrPipeline};
pub use state::{transition, Event, OcrOutcome, OcrRequest, Stage};
pub use text::normalize_text;
