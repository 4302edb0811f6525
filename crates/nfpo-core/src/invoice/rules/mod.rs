//! Rule-based field extractors for Brazilian service invoices.

pub mod amounts;
pub mod dates;
pub mod line_items;
pub mod numbers;
pub mod patterns;
pub mod purchase_orders;

pub use amounts::{format_brl_amount, parse_brl_amount};
pub use dates::{extract_issue_date, DateExtractor};
pub use line_items::{extract_line_items, LineItemExtractor};
pub use numbers::{extract_invoice_number, invoice_number_from_filename, InvoiceNumberExtractor};
pub use purchase_orders::{
    extract_purchase_orders, pos_from_body, pos_from_filename, reconcile_purchase_orders,
};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value found in text together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
