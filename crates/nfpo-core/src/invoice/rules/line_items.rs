//! Line-item matches (`PO 100500 LINHA 1 VALOR 1.234,56 / description`).

use regex::Captures;
use tracing::debug;

use super::patterns::{LINE_LOOSE, LINE_PRECISE};
use super::FieldExtractor;
use crate::models::document::RawLineMatch;

/// Line-item extractor.
///
/// The precise pattern wins whenever it matches at all; the loose pattern
/// only replaces it when it finds nothing.
pub struct LineItemExtractor;

impl LineItemExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LineItemExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for LineItemExtractor {
    type Output = RawLineMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let precise: Vec<RawLineMatch> = LINE_PRECISE.captures_iter(text).map(|c| to_raw(&c)).collect();
        if !precise.is_empty() {
            return precise;
        }

        let loose: Vec<RawLineMatch> = LINE_LOOSE.captures_iter(text).map(|c| to_raw(&c)).collect();
        if !loose.is_empty() {
            debug!("Precise line pattern found nothing, {} loose match(es)", loose.len());
        }
        loose
    }
}

fn to_raw(caps: &Captures<'_>) -> RawLineMatch {
    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    let span = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();

    RawLineMatch {
        po: group("po"),
        line: group("linha"),
        value: group("valor"),
        description: group("descricao"),
        span,
    }
}

/// All line-item matches of a text.
pub fn extract_line_items(text: &str) -> Vec<RawLineMatch> {
    LineItemExtractor::new().extract_all(text)
}
