//! Builds an extraction draft from a file name and its text.

use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::models::document::ExtractionDraft;

use super::rules::{
    extract_invoice_number, extract_issue_date, extract_line_items, extract_purchase_orders,
};

/// Rule-based invoice parser.
///
/// Stateless; parsing the same input twice yields the same draft.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceParser;

impl InvoiceParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a document's text. `filename` is the base name of the file
    /// (a full path is reduced to its last component).
    pub fn parse(&self, filename: &str, text: &str) -> ExtractionDraft {
        let start = Instant::now();
        let filename = base_name(filename);

        let draft = ExtractionDraft {
            invoice_number: extract_invoice_number(filename, text),
            issue_date: extract_issue_date(text),
            purchase_orders: extract_purchase_orders(filename, text),
            line_matches: extract_line_items(text),
        };

        debug!(
            "Parsed {}: nf={:?} date={:?} pos={:?} lines={} in {:?}",
            filename,
            draft.invoice_number,
            draft.issue_date,
            draft.purchase_orders,
            draft.line_matches.len(),
            start.elapsed()
        );
        draft
    }
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
}
