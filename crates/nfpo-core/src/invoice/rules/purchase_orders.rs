//! Purchase order references and their reconciliation.

use std::collections::BTreeSet;

use tracing::debug;

use super::patterns::{PO_BODY, PO_FILENAME_TAIL, PO_TOKEN};

/// Six-digit tokens following the first `PO` marker of a file name,
/// de-duplicated in order.
pub fn pos_from_filename(filename: &str) -> Vec<String> {
    let Some(caps) = PO_FILENAME_TAIL.captures(filename) else {
        return Vec::new();
    };
    unique(PO_TOKEN.find_iter(&caps[1]).map(|m| m.as_str()))
}

/// Six-digit tokens immediately after `PO` in the body, de-duplicated in order.
pub fn pos_from_body(text: &str) -> Vec<String> {
    unique(PO_BODY.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str()))
}

/// Choose between the two PO signals.
///
/// When the sets differ the body list wins, restricted to exactly six ASCII
/// digits; when they agree the file name order is kept.
pub fn reconcile_purchase_orders(from_filename: Vec<String>, from_body: Vec<String>) -> Vec<String> {
    let filename_set: BTreeSet<&str> = from_filename.iter().map(String::as_str).collect();
    let body_set: BTreeSet<&str> = from_body.iter().map(String::as_str).collect();

    if filename_set != body_set {
        debug!(
            "PO mismatch: file name {:?}, body {:?}; using body",
            from_filename, from_body
        );
        return from_body.into_iter().filter(|po| is_po_number(po)).collect();
    }
    from_filename
}

/// Reconciled PO list for a document.
pub fn extract_purchase_orders(filename: &str, text: &str) -> Vec<String> {
    reconcile_purchase_orders(pos_from_filename(filename), pos_from_body(text))
}

/// Exactly six ASCII digits.
pub fn is_po_number(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit())
}

fn unique<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tokens
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}
