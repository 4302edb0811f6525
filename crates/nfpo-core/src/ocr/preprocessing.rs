//! Image preparation for the OCR engine.

use image::{DynamicImage, GrayImage, Luma};
use tracing::trace;

use crate::models::config::OcrConfig;

/// Image preprocessor for the OCR pipeline: grayscale, fixed binarization,
/// then contrast enhancement.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    /// Pixels darker than this become black, the rest white.
    threshold: u8,
    /// Contrast factor (1.0 leaves the image unchanged).
    contrast: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            threshold: 180,
            contrast: 1.5,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            threshold: config.binarize_threshold,
            contrast: config.contrast_factor,
        }
    }

    /// Set the contrast factor.
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    /// Run the full preparation chain.
    pub fn prepare(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let binary = self.binarize(&gray);
        self.enhance_contrast(&binary)
    }

    fn binarize(&self, image: &GrayImage) -> GrayImage {
        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            pixel[0] = if pixel[0] < self.threshold { 0 } else { 255 };
        }
        result
    }

    /// Blend each pixel away from the mean luminance by the contrast factor.
    fn enhance_contrast(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let count = (width as u64 * height as u64).max(1);
        let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
        let mean = (sum as f32 / count as f32 + 0.5).floor();

        trace!("Contrast x{} around mean {}", self.contrast, mean);

        let mut result = GrayImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels() {
            let value = mean + (pixel[0] as f32 - mean) * self.contrast;
            result.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
        result
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
