//! Per-document extraction models and the run-scoped aggregate.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Possibly incomplete fields extracted from one text acquisition.
///
/// Empty fields mean "not found". A retry produces a new draft instead of
/// updating this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDraft {
    /// Invoice number (NF).
    pub invoice_number: String,

    /// Issue date as `dd/mm/yyyy`.
    pub issue_date: String,

    /// Reconciled purchase orders, unique, in source order.
    pub purchase_orders: Vec<String>,

    /// Line-item matches found in the body.
    pub line_matches: Vec<RawLineMatch>,
}

impl ExtractionDraft {
    /// Fields needed to stop the OCR ladder: invoice number, POs and line matches.
    pub fn has_required_fields(&self) -> bool {
        !self.invoice_number.is_empty()
            && !self.purchase_orders.is_empty()
            && !self.line_matches.is_empty()
    }

    /// Every field, including the issue date, was found.
    pub fn is_complete(&self) -> bool {
        self.has_required_fields() && !self.issue_date.is_empty()
    }

    /// Names of the required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.invoice_number.is_empty() {
            missing.push("invoice_number");
        }
        if self.purchase_orders.is_empty() {
            missing.push("purchase_orders");
        }
        if self.line_matches.is_empty() {
            missing.push("line_matches");
        }
        missing
    }
}

/// Named groups captured by a line-item pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineMatch {
    pub po: Option<String>,
    pub line: Option<String>,
    pub value: Option<String>,
    pub description: Option<String>,
    /// Byte range of the whole match in the source text.
    pub span: (usize, usize),
}

impl RawLineMatch {
    pub fn is_empty(&self) -> bool {
        self.po.is_none() && self.line.is_none() && self.value.is_none() && self.description.is_none()
    }
}

/// A validated line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Six-digit purchase order.
    pub po: String,

    /// PO line number.
    pub line: String,

    /// Monetary value, zero when unparsable.
    pub value: Decimal,

    pub description: String,

    /// PO, line and a positive value are all present.
    pub processed: bool,
}

impl LineItem {
    pub fn new(po: String, line: String, value: Decimal, description: String) -> Self {
        let processed = !po.is_empty() && !line.is_empty() && value > Decimal::ZERO;
        Self {
            po,
            line,
            value,
            description,
            processed,
        }
    }
}

/// Routing outcome of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Fully validated.
    #[serde(rename = "sucesso")]
    Success,
    /// Needs manual review.
    #[serde(rename = "falha")]
    Failure,
}

impl DocumentStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "sucesso"),
            Self::Failure => write!(f, "falha"),
        }
    }
}

/// Terminal output of processing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub invoice_number: String,
    pub issue_date: String,
    pub lines: Vec<LineItem>,
    pub status: DocumentStatus,
}

/// One data row of a PO worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    pub invoice_number: String,
    pub issue_date: String,
    pub line: String,
    pub description: String,
    pub value: Decimal,
}

/// Line items of a run grouped by purchase order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    rows: BTreeMap<String, Vec<SheetRow>>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every processed line of a document, whatever its status.
    pub fn absorb(&mut self, result: &DocumentResult) -> usize {
        let mut added = 0;
        for item in result.lines.iter().filter(|l| l.processed) {
            self.push(
                &item.po,
                SheetRow {
                    invoice_number: result.invoice_number.clone(),
                    issue_date: result.issue_date.clone(),
                    line: item.line.clone(),
                    description: item.description.clone(),
                    value: item.value,
                },
            );
            added += 1;
        }
        added
    }

    pub fn push(&mut self, po: &str, row: SheetRow) {
        self.rows.entry(po.to_string()).or_default().push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct purchase orders.
    pub fn po_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<SheetRow>)> {
        self.rows.iter()
    }
}
