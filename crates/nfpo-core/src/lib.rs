//! Core library for Brazilian service invoice (NF) processing.
//!
//! This crate provides:
//! - Direct PDF text extraction
//! - OCR fallback over a DPI ladder (pdftoppm + tesseract)
//! - Invoice number, issue date, purchase order and line item extraction
//! - Line and document validation
//! - Per-PO workbook aggregation with duplicate flagging

pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod workbook;

pub use error::{ConfigError, OcrError, PdfError, WorkbookError};
pub use invoice::{reconcile, InvoiceParser};
pub use models::config::{DpiLadder, NfConfig};
pub use models::document::{
    Aggregate, DocumentResult, DocumentStatus, ExtractionDraft, LineItem, RawLineMatch, SheetRow,
};
pub use ocr::{LadderOutcome, OcrBackend, OcrFallbackEngine, PageRenderer};
pub use pdf::{DirectText, PdfExtractor, PdfProcessor};
pub use pipeline::{Classification, DocumentProcessor, PipelineObserver, SilentObserver, TextSource};
pub use workbook::{MergeReport, WorkbookAggregator};
