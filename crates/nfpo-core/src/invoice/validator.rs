//! Turns a draft into a classified document result.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::document::{DocumentResult, DocumentStatus, ExtractionDraft, LineItem, RawLineMatch};

use super::rules::parse_brl_amount;

/// Validate a draft's lines and decide the document status.
///
/// The document fails when the invoice number is not at least four ASCII
/// digits, a line is empty, incomplete or has an unparsable value, a line
/// refers to a PO outside the draft's list, or no line survives.
/// Processed lines with an unknown PO are kept; incomplete lines are dropped.
pub fn reconcile(draft: ExtractionDraft) -> DocumentResult {
    let ExtractionDraft {
        invoice_number,
        issue_date,
        purchase_orders,
        line_matches,
    } = draft;

    let invoice_number = invoice_number.trim().to_string();
    let issue_date = issue_date.trim().to_string();
    let mut status = DocumentStatus::Success;

    if !is_valid_invoice_number(&invoice_number) {
        debug!("Invalid invoice number {:?}", invoice_number);
        status = DocumentStatus::Failure;
    }

    let mut lines = Vec::with_capacity(line_matches.len());
    for raw in &line_matches {
        if raw.is_empty() {
            warn!("Empty line match at {:?}", raw.span);
            status = DocumentStatus::Failure;
            continue;
        }

        let (item, value_ok) = line_item(raw);
        if !value_ok {
            warn!("Invalid value {:?} for PO {}", raw.value, item.po);
            status = DocumentStatus::Failure;
        }

        if !item.processed {
            warn!("Incomplete line: {:?}", item);
            status = DocumentStatus::Failure;
            continue;
        }

        if !purchase_orders.contains(&item.po) {
            warn!("PO {} not in document list {:?}", item.po, purchase_orders);
            status = DocumentStatus::Failure;
        }
        lines.push(item);
    }

    if lines.is_empty() {
        status = DocumentStatus::Failure;
    }

    DocumentResult {
        invoice_number,
        issue_date,
        lines,
        status,
    }
}

/// Build a line item; the flag is false when the value could not be parsed.
fn line_item(raw: &RawLineMatch) -> (LineItem, bool) {
    let trimmed = |field: &Option<String>| field.as_deref().map(str::trim).unwrap_or("").to_string();

    let (value, value_ok) = match raw.value.as_deref() {
        None => (Decimal::ZERO, true),
        Some(text) => match parse_brl_amount(text) {
            Some(value) => (value, true),
            None => (Decimal::ZERO, false),
        },
    };

    let item = LineItem::new(trimmed(&raw.po), trimmed(&raw.line), value, trimmed(&raw.description));
    (item, value_ok)
}

/// At least four characters, all ASCII digits.
pub fn is_valid_invoice_number(number: &str) -> bool {
    number.len() >= 4 && number.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn raw(po: &str, line: &str, value: &str, description: &str) -> RawLineMatch {
        RawLineMatch {
            po: Some(po.to_string()),
            line: Some(line.to_string()),
            value: Some(value.to_string()),
            description: Some(description.to_string()),
            span: (0, 0),
        }
    }

    fn draft(lines: Vec<RawLineMatch>) -> ExtractionDraft {
        ExtractionDraft {
            invoice_number: "4521".to_string(),
            issue_date: "01/02/2024".to_string(),
            purchase_orders: vec!["100500".to_string()],
            line_matches: lines,
        }
    }

    #[test]
    fn test_valid_document() {
        let result = reconcile(draft(vec![raw("100500", "1", "1.234,56", " Servico ")]));

        assert_eq!(result.status, DocumentStatus::Success);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].value, Decimal::from_str("1234.56").unwrap());
        assert_eq!(result.lines[0].description, "Servico");
        assert!(result.lines[0].processed);
    }

    #[test]
    fn test_short_invoice_number_fails() {
        let mut d = draft(vec![raw("100500", "1", "10,00", "X")]);
        d.invoice_number = "77".to_string();
        let result = reconcile(d);

        assert_eq!(result.status, DocumentStatus::Failure);
        assert_eq!(result.lines.len(), 1);
    }

    #[test]
    fn test_malformed_value_drops_line() {
        let result = reconcile(draft(vec![
            raw("100500", "1", "12,,3", "X"),
            raw("100500", "2", "5,00", "Y"),
        ]));

        assert_eq!(result.status, DocumentStatus::Failure);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].line, "2");
    }

    #[test]
    fn test_zero_value_is_not_processed() {
        let result = reconcile(draft(vec![raw("100500", "1", "0,00", "X")]));
        assert_eq!(result.status, DocumentStatus::Failure);
        assert!(result.lines.is_empty());
    }

    #[test]
    fn test_unknown_po_is_kept_but_fails() {
        let result = reconcile(draft(vec![
            raw("100500", "1", "10,00", "X"),
            raw("100501", "2", "20,00", "Y"),
        ]));

        assert_eq!(result.status, DocumentStatus::Failure);
        let pos: Vec<_> = result.lines.iter().map(|l| l.po.as_str()).collect();
        assert_eq!(pos, vec!["100500", "100501"]);
    }

    #[test]
    fn test_empty_match_fails() {
        let result = reconcile(draft(vec![RawLineMatch::default(), raw("100500", "1", "10,00", "X")]));
        assert_eq!(result.status, DocumentStatus::Failure);
        assert_eq!(result.lines.len(), 1);
    }

    #[test]
    fn test_no_lines_fails() {
        let result = reconcile(draft(Vec::new()));
        assert_eq!(result.status, DocumentStatus::Failure);
    }

    #[test]
    fn test_invoice_number_rules() {
        assert!(is_valid_invoice_number("0001"));
        assert!(!is_valid_invoice_number("123"));
        assert!(!is_valid_invoice_number("12a45"));
        assert!(!is_valid_invoice_number("１２３４"));
    }
}
