use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageReader, Luma};
use tracing::debug;

use crate::config::PreprocessingConfig;
use crate::error::{GatewayError, Result};

/// Imaging primitives the preprocessor is built from.
///
/// Kept narrow so the normalization sequence can be exercised without a
/// particular imaging library.
pub trait ImageOps: Send + Sync {
    /// Decode an encoded image and reduce it to single-channel luminance.
    fn decode_luma(&self, bytes: &[u8]) -> Result<GrayImage>;

    fn smooth(&self, image: &GrayImage, radius: u32) -> GrayImage;

    fn binarize(&self, image: GrayImage, threshold: u8) -> GrayImage;

    fn encode(&self, image: &GrayImage) -> Result<Vec<u8>>;
}

/// [`ImageOps`] on top of the `image` crate, encoding to JPEG.
#[derive(Debug, Clone, Copy)]
pub struct StandardImageOps {
    jpeg_quality: u8,
}

impl StandardImageOps {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl ImageOps for StandardImageOps {
    fn decode_luma(&self, bytes: &[u8]) -> Result<GrayImage> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| GatewayError::InvalidImage(format!("Failed to read image: {e}")))?;

        let img = reader
            .decode()
            .map_err(|e| GatewayError::InvalidImage(format!("Failed to decode image: {e}")))?;

        Ok(img.to_luma8())
    }

    fn smooth(&self, image: &GrayImage, radius: u32) -> GrayImage {
        median_filter(image, radius)
    }

    fn binarize(&self, image: GrayImage, threshold: u8) -> GrayImage {
        binarize(image, threshold)
    }

    fn encode(&self, image: &GrayImage) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, self.jpeg_quality)
            .encode_image(image)
            .map_err(|e| GatewayError::Internal(format!("Failed to encode image: {e}")))?;
        Ok(output)
    }
}

/// Normalizes raw images into high-contrast JPEGs for the OCR engine.
///
/// Steps, in order:
/// 1. Reject inputs larger than `max_image_bytes`
/// 2. Decode and convert to luminance
/// 3. Median smoothing to drop speckle noise while keeping stroke edges
/// 4. Global threshold binarization (below threshold → black, else white)
/// 5. Re-encode as JPEG
///
/// The threshold is global, not adaptive, so unevenly lit photos can lose
/// text in shadowed regions.
#[derive(Clone)]
pub struct ImagePreprocessor {
    config: PreprocessingConfig,
    ops: Arc<dyn ImageOps>,
}

impl ImagePreprocessor {
    pub fn new(config: &PreprocessingConfig) -> Self {
        let ops = StandardImageOps::new(config.jpeg_quality);
        Self::with_ops(config, Arc::new(ops))
    }

    pub fn with_ops(config: &PreprocessingConfig, ops: Arc<dyn ImageOps>) -> Self {
        Self {
            config: config.clone(),
            ops,
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.config.max_image_bytes
    }

    pub fn check_size(&self, raw: &[u8]) -> Result<()> {
        if raw.len() > self.config.max_image_bytes {
            return Err(GatewayError::ImageTooLarge {
                size: raw.len(),
                max: self.config.max_image_bytes,
            });
        }
        Ok(())
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>> {
        self.check_size(raw)?;

        let gray = self.ops.decode_luma(raw)?;
        let (width, height) = gray.dimensions();

        let smoothed = self.ops.smooth(&gray, self.config.median_radius);
        let binary = self
            .ops
            .binarize(smoothed, self.config.binarize_threshold);
        let encoded = self.ops.encode(&binary)?;

        debug!(
            width,
            height,
            input_bytes = raw.len(),
            output_bytes = encoded.len(),
            "Image normalized for OCR"
        );

        Ok(encoded)
    }
}

/// Median filter over a `(2r+1)²` window. Borders replicate edge pixels.
pub fn median_filter(image: &GrayImage, radius: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    let r = i64::from(radius);
    let max_x = i64::from(width) - 1;
    let max_y = i64::from(height) - 1;
    let side = 2 * radius as usize + 1;
    let mut window: Vec<u8> = Vec::with_capacity(side * side);

    GrayImage::from_fn(width, height, |x, y| {
        window.clear();
        for dy in -r..=r {
            let sy = (i64::from(y) + dy).clamp(0, max_y) as u32;
            for dx in -r..=r {
                let sx = (i64::from(x) + dx).clamp(0, max_x) as u32;
                window.push(image.get_pixel(sx, sy)[0]);
            }
        }
        let mid = window.len() / 2;
        let (_, median, _) = window.select_nth_unstable(mid);
        Luma([*median])
    })
}

/// Pixels below `threshold` become black, everything else white.
pub fn binarize(mut image: GrayImage, threshold: u8) -> GrayImage {
    for pixel in image.pixels_mut() {
        pixel[0] = if pixel[0] < threshold { 0 } else { 255 };
    }
    image
}
