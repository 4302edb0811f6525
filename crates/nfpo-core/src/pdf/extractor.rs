//! Direct PDF text extraction using lopdf and pdf-extract.

use std::panic;
use std::path::Path;

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF text extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Text obtained by direct extraction.
#[derive(Debug, Default)]
pub struct DirectText {
    /// Page texts joined with a newline and trimmed; empty on failure.
    pub text: String,
    /// Number of pages read.
    pub pages: u32,
    /// Why extraction produced nothing, when it failed.
    pub error: Option<PdfError>,
}

impl DirectText {
    fn failed(error: PdfError) -> Self {
        Self {
            text: String::new(),
            pages: 0,
            error: Some(error),
        }
    }
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Read a document from disk and extract its text.
    ///
    /// Never fails: any problem is reported through [`DirectText::error`]
    /// together with empty text.
    pub fn extract_direct(path: &Path) -> DirectText {
        debug!("Direct text extraction: {}", path.display());

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(source) => {
                let error = PdfError::Read {
                    path: path.display().to_string(),
                    source,
                };
                warn!("{}", error);
                return DirectText::failed(error);
            }
        };

        let mut extractor = Self::new();
        if let Err(error) = extractor.load(&data) {
            warn!("Failed to load {}: {}", path.display(), error);
            return DirectText::failed(error);
        }

        match extractor.extract_text() {
            Ok(text) => DirectText {
                text,
                pages: extractor.page_count(),
                error: None,
            },
            Err(error) => {
                warn!("Failed to extract text from {}: {}", path.display(), error);
                DirectText::failed(error)
            }
        }
    }

    /// Page-by-page fallback through lopdf; failing pages become empty strings.
    fn extract_pages_individually(&self, doc: &Document) -> Vec<String> {
        let mut pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        pages.sort_unstable();

        pages
            .into_iter()
            .map(|page| match doc.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    trace!("Page {} text extraction failed: {}", page, e);
                    String::new()
                }
            })
            .collect()
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // Save decrypted document to raw_data for pdf_extract
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_pages(&self) -> Result<Vec<String>> {
        let doc = self
            .document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))?;

        // pdf-extract panics on some malformed content streams.
        let data = &self.raw_data;
        let by_pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data));

        match by_pages {
            Ok(Ok(pages)) if pages.len() == self.page_count() as usize => Ok(pages),
            Ok(Ok(pages)) => {
                debug!(
                    "pdf-extract returned {} pages for a {}-page document, using lopdf",
                    pages.len(),
                    self.page_count()
                );
                Ok(self.extract_pages_individually(doc))
            }
            Ok(Err(e)) => {
                debug!("pdf-extract failed ({}), using lopdf per page", e);
                Ok(self.extract_pages_individually(doc))
            }
            Err(_) => {
                warn!("pdf-extract panicked, using lopdf per page");
                Ok(self.extract_pages_individually(doc))
            }
        }
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }
        let pages = self.extract_pages()?;
        Ok(pages.get((page - 1) as usize).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_pages().is_err());
    }

    #[test]
    fn test_extract_direct_missing_file() {
        let result = PdfExtractor::extract_direct(Path::new("/nonexistent/NF 1234.pdf"));
        assert!(result.text.is_empty());
        assert!(matches!(result.error, Some(PdfError::Read { .. })));
    }

    #[test]
    fn test_extract_direct_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let result = PdfExtractor::extract_direct(&path);
        assert!(result.text.is_empty());
        assert!(matches!(result.error, Some(PdfError::Parse(_))));
    }

    #[test]
    fn test_extract_direct_two_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NF 4521.pdf");
        crate::pdf::fixtures::write_text_pdf(
            &path,
            &[
                &["NOTA FISCAL 4521", "Emissao: 01/02/2024"],
                &["PO 100500 LINHA 1 VALOR 1.000,00 / Servico"],
            ],
        );

        let result = PdfExtractor::extract_direct(&path);
        assert!(result.error.is_none());
        assert_eq!(result.pages, 2);

        let first = result.text.find("NOTA FISCAL 4521").unwrap();
        let second = result.text.find("PO 100500 LINHA 1").unwrap();
        assert!(first < second);

        let mut extractor = PdfExtractor::new();
        extractor.load(&std::fs::read(&path).unwrap()).unwrap();
        let pages = extractor.extract_pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[1].contains("VALOR 1.000,00"));
        assert_eq!(result.text, pages.join("\n").trim());
        assert!(extractor.extract_page_text(1).unwrap().contains("Emissao: 01/02/2024"));
        assert!(matches!(extractor.extract_page_text(3), Err(PdfError::InvalidPage(3))));
    }
}
