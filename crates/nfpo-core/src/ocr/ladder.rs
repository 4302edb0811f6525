//! Resolution ladder: render, recognize and parse at increasing DPI.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{ImagePreprocessor, OcrBackend, PageRenderer};
use crate::invoice::InvoiceParser;
use crate::models::config::DpiLadder;
use crate::models::document::ExtractionDraft;

/// Draft produced by the ladder and how it got there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LadderOutcome {
    /// Draft of the last tier attempted.
    pub draft: ExtractionDraft,
    /// Resolutions tried, in order.
    pub tiers_attempted: Vec<u32>,
    /// The draft has every required field.
    pub complete: bool,
}

/// OCR fallback over a DPI ladder.
pub struct OcrFallbackEngine<R, O> {
    renderer: R,
    backend: O,
    preprocessor: ImagePreprocessor,
    ladder: DpiLadder,
    parser: InvoiceParser,
}

impl<R: PageRenderer, O: OcrBackend> OcrFallbackEngine<R, O> {
    pub fn new(renderer: R, backend: O, ladder: DpiLadder) -> Self {
        Self {
            renderer,
            backend,
            preprocessor: ImagePreprocessor::new(),
            ladder,
            parser: InvoiceParser::new(),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn ladder(&self) -> DpiLadder {
        self.ladder
    }

    /// OCR every page of `path` at `dpi`.
    ///
    /// Any render failure yields empty text; a page that fails to
    /// recognize is skipped.
    pub fn ocr_text(&self, path: &Path, dpi: u32) -> String {
        let start = Instant::now();

        let pages = match self.renderer.render(path, dpi) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Rendering {} at {} DPI failed: {}", path.display(), dpi, e);
                return String::new();
            }
        };

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let prepared = self.preprocessor.prepare(page);
            match self.backend.recognize(&prepared) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
                Err(e) => warn!("OCR failed on page {} at {} DPI: {}", index + 1, dpi, e),
            }
        }

        debug!(
            "OCR at {} DPI: {} page(s), {} with text, {:?}",
            dpi,
            pages.len(),
            texts.len(),
            start.elapsed()
        );
        texts.join("\n")
    }

    /// Climb the ladder until a draft has every required field.
    ///
    /// Each tier re-renders and re-reads the whole document; its draft
    /// replaces the previous one even when it finds less. When the ceiling
    /// is reached the last draft is returned as is.
    pub fn run(&self, path: &Path, filename: &str) -> LadderOutcome {
        let mut outcome = LadderOutcome::default();

        for dpi in self.ladder.tiers() {
            info!("OCR attempt at {} DPI: {}", dpi, filename);
            let text = self.ocr_text(path, dpi);

            outcome.draft = self.parser.parse(filename, &text);
            outcome.tiers_attempted.push(dpi);

            if outcome.draft.has_required_fields() {
                outcome.complete = true;
                info!("All required fields found at {} DPI", dpi);
                break;
            }
            debug!("Missing at {} DPI: {:?}", dpi, outcome.draft.missing_fields());
        }

        if !outcome.complete {
            warn!(
                "OCR ladder exhausted for {} after {:?}",
                filename, outcome.tiers_attempted
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::Result;
    use image::{DynamicImage, GrayImage};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const COMPLETE: &str = "Número da Nota: 4521\nPO 100500 LINHA 1 VALOR 10,00 / Servico";
    const PARTIAL: &str = "Número da Nota: 4521";

    /// One blank page per call; the page width carries the DPI to the backend.
    struct FakeRenderer {
        calls: RefCell<Vec<u32>>,
        failing: Vec<u32>,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                failing: Vec::new(),
            }
        }
    }

    impl PageRenderer for FakeRenderer {
        fn render(&self, _path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
            self.calls.borrow_mut().push(dpi);
            if self.failing.contains(&dpi) {
                return Err(OcrError::NoPages { dpi });
            }
            Ok(vec![DynamicImage::ImageLuma8(GrayImage::new(dpi, 1))])
        }
    }

    struct FakeBackend {
        by_dpi: HashMap<u32, &'static str>,
    }

    impl OcrBackend for FakeBackend {
        fn recognize(&self, image: &GrayImage) -> Result<String> {
            Ok(self.by_dpi.get(&image.width()).copied().unwrap_or("").to_string())
        }
    }

    fn engine<'a>(renderer: &'a FakeRenderer, texts: &[(u32, &'static str)]) -> OcrFallbackEngine<&'a FakeRenderer, FakeBackend> {
        let backend = FakeBackend {
            by_dpi: texts.iter().copied().collect(),
        };
        OcrFallbackEngine::new(renderer, backend, DpiLadder::default())
    }

    #[test]
    fn test_ladder_exhausted_returns_partial_draft() {
        let renderer = FakeRenderer::new();
        let outcome = engine(&renderer, &[(600, PARTIAL)]).run(Path::new("scan.pdf"), "scan.pdf");

        assert_eq!(outcome.tiers_attempted, vec![300, 400, 500, 600]);
        assert_eq!(*renderer.calls.borrow(), vec![300, 400, 500, 600]);
        assert!(!outcome.complete);
        assert_eq!(outcome.draft.invoice_number, "4521");
        assert!(outcome.draft.line_matches.is_empty());
    }

    #[test]
    fn test_stops_at_first_complete_tier() {
        let renderer = FakeRenderer::new();
        let outcome = engine(&renderer, &[(400, COMPLETE), (500, COMPLETE)])
            .run(Path::new("NF 4521 PO 100500.pdf"), "NF 4521 PO 100500.pdf");

        assert_eq!(outcome.tiers_attempted, vec![300, 400]);
        assert!(outcome.complete);
        assert_eq!(outcome.draft.purchase_orders, vec!["100500".to_string()]);
    }

    #[test]
    fn test_latest_draft_replaces_earlier_one() {
        let mut renderer = FakeRenderer::new();
        renderer.failing = vec![500];
        let outcome = engine(&renderer, &[(300, PARTIAL), (400, PARTIAL)]).run(Path::new("scan.pdf"), "scan.pdf");

        // 600 produced nothing, so the number found at 300/400 is gone.
        assert_eq!(outcome.tiers_attempted.len(), 4);
        assert_eq!(outcome.draft, ExtractionDraft::default());
    }

    #[test]
    fn test_render_failure_is_empty_text() {
        let mut renderer = FakeRenderer::new();
        renderer.failing = vec![300];
        let text = engine(&renderer, &[(300, COMPLETE)]).ocr_text(Path::new("scan.pdf"), 300);
        assert_eq!(text, "");
    }

    #[test]
    fn test_single_tier_ladder() {
        let renderer = FakeRenderer::new();
        let engine = OcrFallbackEngine::new(
            &renderer,
            FakeBackend { by_dpi: HashMap::new() },
            DpiLadder::new(300, 300, 100),
        );
        assert_eq!(engine.run(Path::new("a.pdf"), "a.pdf").tiers_attempted, vec![300]);
    }
}
