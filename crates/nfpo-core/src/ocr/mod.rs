//! OCR fallback: page rendering, image preparation, tesseract and the DPI ladder.

mod ladder;
mod preprocessing;
mod render;
mod tesseract;

pub use ladder::{LadderOutcome, OcrFallbackEngine};
pub use preprocessing::ImagePreprocessor;
pub use render::PdftoppmRenderer;
pub use tesseract::TesseractEngine;

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::OcrError;

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Rasterizes a document into page images.
pub trait PageRenderer {
    /// Render every page of `path` at `dpi`, in page order.
    fn render(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>>;
}

/// Turns a prepared page image into text.
pub trait OcrBackend {
    /// Recognize the text of one page.
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

impl<T: PageRenderer + ?Sized> PageRenderer for &T {
    fn render(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
        (**self).render(path, dpi)
    }
}

impl<T: OcrBackend + ?Sized> OcrBackend for &T {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        (**self).recognize(image)
    }
}
