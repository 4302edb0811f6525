//! PDF processing module.

mod extractor;
#[cfg(test)]
pub(crate) mod fixtures;

pub use extractor::{DirectText, PdfExtractor};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from every page, in page order.
    fn extract_pages(&self) -> Result<Vec<String>>;

    /// Extract text from a specific page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Extract text from the entire PDF, pages joined with a newline.
    fn extract_text(&self) -> Result<String> {
        Ok(self.extract_pages()?.join("\n").trim().to_string())
    }
}
