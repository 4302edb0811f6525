//! Error types for the nfpo-core library.

use thiserror::Error;

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The file could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to page rendering and OCR.
#[derive(Error, Debug)]
pub enum OcrError {
    /// An external tool could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a failure status.
    #[error("{tool} failed (exit code {code}): {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// Rendering produced no page images.
    #[error("no pages rendered at {dpi} DPI")]
    NoPages { dpi: u32 },

    /// Image preprocessing or decoding failed.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Temporary working files could not be created.
    #[error("temporary file error: {0}")]
    TempFile(#[from] std::io::Error),
}

/// Errors related to loading and saving the output workbook.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The existing workbook could not be opened or read.
    #[error("failed to read workbook {path}: {reason}")]
    Load { path: String, reason: String },

    /// A purchase order that cannot name a `PO_<digits>` sheet.
    #[error("invalid purchase order for a sheet name: {0:?}")]
    InvalidPo(String),

    /// Writing a new workbook failed.
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Editing an existing workbook failed.
    #[error("failed to edit workbook: {0}")]
    Edit(String),

    /// The workbook archive could not be rewritten.
    #[error("workbook archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The output directory is missing or not writable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The DPI ladder cannot produce a finite, non-empty sequence of tiers.
    #[error("invalid DPI ladder (initial={initial}, max={max}, step={step}): {reason}")]
    DpiLadder {
        initial: u32,
        max: u32,
        step: u32,
        reason: &'static str,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// The configuration file could not be parsed or serialized.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read or written.
    #[error("configuration file error: {0}")]
    Io(#[from] std::io::Error),
}
