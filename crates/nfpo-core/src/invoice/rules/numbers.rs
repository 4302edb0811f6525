//! Invoice (NF) number extraction.

use super::patterns::{DIGIT_RUN, NF_AFTER_NOTA, NF_FILENAME, NF_LABELLED};
use super::{ExtractionMatch, FieldExtractor};

/// Finds the invoice number in the document body.
///
/// Labelled forms ("número da nota", "nota:") are preferred; otherwise the
/// first run of four or more digits that does not open with four zeros.
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InvoiceNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        for pattern in [&*NF_LABELLED, &*NF_AFTER_NOTA] {
            if let Some(caps) = pattern.captures(text) {
                let number = &caps[1];
                let whole = caps.get(0)?;
                return Some(
                    ExtractionMatch::new(number.to_string(), whole.as_str())
                        .with_position(whole.start(), whole.end()),
                );
            }
        }
        self.extract_all(text).into_iter().next()
    }

    /// Every unlabelled candidate, in text order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DIGIT_RUN
            .find_iter(text)
            .filter(|m| !m.as_str().starts_with("0000"))
            .map(|m| ExtractionMatch::new(m.as_str().to_string(), m.as_str()).with_position(m.start(), m.end()))
            .collect()
    }
}

/// Invoice number from a file name such as `NF.4521 PO 100500.pdf`.
pub fn invoice_number_from_filename(filename: &str) -> Option<String> {
    NF_FILENAME.captures(filename).map(|caps| caps[1].to_string())
}

/// Invoice number, preferring the file name over the body.
pub fn extract_invoice_number(filename: &str, text: &str) -> String {
    invoice_number_from_filename(filename)
        .or_else(|| InvoiceNumberExtractor::new().extract(text).map(|m| m.value))
        .unwrap_or_default()
}
