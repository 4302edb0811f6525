//! Per-document pipeline: direct text, OCR fallback, validation.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::invoice::{reconcile, InvoiceParser};
use crate::models::config::NfConfig;
use crate::models::document::{DocumentResult, ExtractionDraft};
use crate::ocr::{ImagePreprocessor, OcrBackend, OcrFallbackEngine, PageRenderer, PdftoppmRenderer, TesseractEngine};
use crate::pdf::PdfExtractor;

/// Receives progress and status text from a run.
///
/// Messages are plain text; presentation is up to the implementor.
pub trait PipelineObserver {
    /// `current` of `total` documents started.
    fn progress(&self, _current: usize, _total: usize) {}

    fn message(&self, _text: &str) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {}

/// Where the text of the final draft came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TextSource {
    /// Embedded PDF text was enough.
    Direct,
    /// The OCR ladder ran over these resolutions.
    Ocr { tiers: Vec<u32>, complete: bool },
    /// Direct text was insufficient and OCR was disabled.
    DirectOnly,
}

/// A classified document and how it was read.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    #[serde(flatten)]
    pub result: DocumentResult,
    pub source: TextSource,
    pub elapsed_ms: u64,
}

/// Classifies one document at a time.
pub struct DocumentProcessor<R = PdftoppmRenderer, O = TesseractEngine> {
    ocr: OcrFallbackEngine<R, O>,
    parser: InvoiceParser,
    text_only: bool,
}

impl DocumentProcessor {
    /// Processor using `pdftoppm` and `tesseract` as configured.
    pub fn from_config(config: &NfConfig) -> Self {
        let engine = OcrFallbackEngine::new(
            PdftoppmRenderer::from_config(&config.ocr),
            TesseractEngine::from_config(&config.ocr),
            config.dpi,
        )
        .with_preprocessor(ImagePreprocessor::from_config(&config.ocr));
        Self::new(engine)
    }
}

impl<R: PageRenderer, O: OcrBackend> DocumentProcessor<R, O> {
    pub fn new(ocr: OcrFallbackEngine<R, O>) -> Self {
        Self {
            ocr,
            parser: InvoiceParser::new(),
            text_only: false,
        }
    }

    /// Never fall back to OCR.
    pub fn with_text_only(mut self, text_only: bool) -> Self {
        self.text_only = text_only;
        self
    }

    /// Classify a document. Never fails: problems end up as `falha`.
    pub fn classify(&self, path: &Path) -> DocumentResult {
        self.classify_with(path, &SilentObserver).result
    }

    /// Classify a document, reporting each stage to `observer`.
    pub fn classify_with(&self, path: &Path, observer: &dyn PipelineObserver) -> Classification {
        let start = Instant::now();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        observer.message("Direct text extraction");
        let direct = PdfExtractor::extract_direct(path);
        if let Some(error) = &direct.error {
            observer.message(&format!("Cannot read PDF: {}", error));
        }
        let draft = self.parser.parse(&filename, &direct.text);

        let (draft, source) = self.fallback(path, &filename, draft, observer);
        let result = reconcile(draft);

        info!(
            "{}: {} ({} line(s), {:?})",
            filename,
            result.status,
            result.lines.len(),
            source
        );
        observer.message(&format!("Status: {}", result.status.to_string().to_uppercase()));

        Classification {
            result,
            source,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn fallback(
        &self,
        path: &Path,
        filename: &str,
        draft: ExtractionDraft,
        observer: &dyn PipelineObserver,
    ) -> (ExtractionDraft, TextSource) {
        if draft.has_required_fields() {
            return (draft, TextSource::Direct);
        }

        debug!("Direct text incomplete for {}: missing {:?}", filename, draft.missing_fields());
        if self.text_only {
            return (draft, TextSource::DirectOnly);
        }

        observer.message("Direct text incomplete, trying OCR");
        let outcome = self.ocr.run(path, filename);
        let source = TextSource::Ocr {
            tiers: outcome.tiers_attempted,
            complete: outcome.complete,
        };
        if outcome.complete {
            observer.message("OCR found every required field");
        } else {
            observer.message("OCR ladder exhausted with missing fields");
        }
        (outcome.draft, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::models::config::DpiLadder;
    use crate::models::document::DocumentStatus;
    use crate::ocr::Result;
    use image::{DynamicImage, GrayImage};
    use std::cell::RefCell;

    struct OnePage;

    impl PageRenderer for OnePage {
        fn render(&self, _path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>> {
            Ok(vec![DynamicImage::ImageLuma8(GrayImage::new(2, 2))])
        }
    }

    struct FixedText(&'static str);

    impl OcrBackend for FixedText {
        fn recognize(&self, _image: &GrayImage) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    impl OcrBackend for Broken {
        fn recognize(&self, _image: &GrayImage) -> Result<String> {
            Err(OcrError::InvalidImage("broken".to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl PipelineObserver for Recorder {
        fn message(&self, text: &str) {
            self.0.borrow_mut().push(text.to_string());
        }
    }

    fn processor<O: OcrBackend>(backend: O) -> DocumentProcessor<OnePage, O> {
        DocumentProcessor::new(OcrFallbackEngine::new(OnePage, backend, DpiLadder::new(300, 400, 100)))
    }

    #[test]
    fn test_unreadable_pdf_goes_through_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NF 4521 PO 100500.pdf");
        std::fs::write(&path, b"scanned garbage").unwrap();

        let text = "Emissão: 01/02/2024\nPO 100500 LINHA 1 VALOR 1.000,00 / Servico";
        let classification = processor(FixedText(text)).classify_with(&path, &SilentObserver);

        assert_eq!(
            classification.source,
            TextSource::Ocr { tiers: vec![300], complete: true }
        );
        assert_eq!(classification.result.status, DocumentStatus::Success);
        assert_eq!(classification.result.invoice_number, "4521");
        assert_eq!(classification.result.issue_date, "01/02/2024");
    }

    #[test]
    fn test_missing_file_is_failure() {
        let recorder = Recorder::default();
        let classification = processor(Broken).classify_with(Path::new("/nonexistent/NF 1.pdf"), &recorder);

        assert_eq!(classification.result.status, DocumentStatus::Failure);
        assert!(classification.result.lines.is_empty());
        assert_eq!(
            classification.source,
            TextSource::Ocr { tiers: vec![300, 400], complete: false }
        );
        let messages = recorder.0.borrow();
        assert!(messages.iter().any(|m| m.starts_with("Cannot read PDF")));
        assert_eq!(messages.last().map(String::as_str), Some("Status: FALHA"));
    }

    #[test]
    fn test_text_only_skips_ocr() {
        let result = processor(Broken)
            .with_text_only(true)
            .classify_with(Path::new("/nonexistent/NF 1.pdf"), &SilentObserver);
        assert_eq!(result.source, TextSource::DirectOnly);
        assert_eq!(result.result.invoice_number, "1");
        assert_eq!(result.result.status, DocumentStatus::Failure);
        assert!(result.result.lines.is_empty());
    }

    #[test]
    fn test_text_pdf_needs_no_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NF 4521 PO 100500.pdf");
        crate::pdf::fixtures::write_text_pdf(
            &path,
            &[
                &["Emissao: 01/02/2024"],
                &["PO 100500 LINHA 1 VALOR 1.000,00 / Servico"],
            ],
        );

        // the OCR backend fails, so a success can only come from the PDF text
        let recorder = Recorder::default();
        let classification = processor(Broken).classify_with(&path, &recorder);

        assert_eq!(classification.source, TextSource::Direct);
        assert_eq!(classification.result.status, DocumentStatus::Success);
        assert_eq!(classification.result.invoice_number, "4521");
        assert_eq!(classification.result.issue_date, "01/02/2024");
        assert_eq!(classification.result.lines.len(), 1);
        assert_eq!(classification.result.lines[0].po, "100500");
        assert!(!recorder.0.borrow().iter().any(|m| m.contains("OCR")));
    }
}
