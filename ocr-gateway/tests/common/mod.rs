#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use serde_json::json;

use ocr_gateway::config::OcrConfig;
use ocr_gateway::retry::Sleeper;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A small white PNG with a dark horizontal stroke.
pub fn png_bytes() -> Vec<u8> {
    let mut image = GrayImage::from_pixel(32, 32, Luma([250]));
    for x in 4..28 {
        for y in 14..18 {
            image.put_pixel(x, y, Luma([10]));
        }
    }

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buf
}

pub fn png_base64() -> String {
    STANDARD.encode(png_bytes())
}

/// A PNG of pseudo-random pixels. Noise does not compress, so the file is
/// roughly `side * side * 3` bytes.
pub fn noisy_png_bytes(side: u32) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    let image = RgbImage::from_fn(side, side, |_, _| {
        let [r, g, b, _] = next().to_le_bytes();
        Rgb([r, g, b])
    });

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode noisy PNG");
    buf
}

/// Base64 broken into 76-column lines joined by CRLF, as MIME encoders emit it.
pub fn wrapped_base64(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .as_bytes()
        .chunks(76)
        .map(|line| std::str::from_utf8(line).expect("base64 is ASCII"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// OCR settings pointed at a mock provider, with no delay between attempts.
pub fn ocr_config(base_url: &str, max_attempts: u32) -> OcrConfig {
    OcrConfig {
        model: "ocrspace".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url.to_string()),
        default_language: "spa".to_string(),
        timeout_secs: 5,
        max_attempts,
        retry_delay_ms: 0,
    }
}

/// Successful `/parse/image` response carrying `text`.
pub fn parsed_body(text: &str) -> serde_json::Value {
    json!({
        "ParsedResults": [
            {
                "TextOverlay": { "Lines": [], "HasOverlay": false },
                "FileParseExitCode": 1,
                "ParsedText": text,
                "ErrorMessage": "",
                "ErrorDetails": ""
            }
        ],
        "OCRExitCode": 1,
        "IsErroredOnProcessing": false,
        "ProcessingTimeInMilliseconds": "312"
    })
}

/// `/parse/image` response for a request the provider refused to process.
pub fn errored_body(message: &str) -> serde_json::Value {
    json!({
        "OCRExitCode": 99,
        "IsErroredOnProcessing": true,
        "ErrorMessage": [message],
        "ProcessingTimeInMilliseconds": "0"
    })
}

/// Records requested sleeps instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
