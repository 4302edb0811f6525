//! Issue date extraction.

use chrono::NaiveDate;
use tracing::trace;

use super::patterns::{DATE_BARE, DATE_EMISSION_LABEL, DATE_GENERIC_LABEL};
use super::{ExtractionMatch, FieldExtractor};

/// Output format of issue dates.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Date field extractor.
///
/// Patterns are tried from most to least specific; within a pattern,
/// matches are tried in text order. Calendar-invalid dates are skipped.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in [&*DATE_EMISSION_LABEL, &*DATE_GENERIC_LABEL, &*DATE_BARE] {
            for caps in pattern.captures_iter(text) {
                let Some(token) = caps.get(1) else { continue };
                let normalized = normalize_separators(token.as_str());

                match NaiveDate::parse_from_str(&normalized, DATE_FORMAT) {
                    Ok(date) => results.push(
                        ExtractionMatch::new(date, token.as_str()).with_position(token.start(), token.end()),
                    ),
                    Err(_) => trace!("Skipping invalid date {}", token.as_str()),
                }
            }
        }

        results
    }
}

/// `31-03-2024` and `31.03.2024` become `31/03/2024`.
fn normalize_separators(token: &str) -> String {
    token.replace(['-', '.'], "/")
}

/// Issue date as `dd/mm/yyyy`, or empty when none is found.
pub fn extract_issue_date(text: &str) -> String {
    DateExtractor::new()
        .extract(text)
        .map(|m| m.value.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_normalized() {
        assert_eq!(extract_issue_date("vencimento 31-03-2024"), "31/03/2024");
        assert_eq!(extract_issue_date("vencimento 31.03.2024"), "31/03/2024");
        assert_eq!(extract_issue_date("vencimento 31/03/2024"), "31/03/2024");
    }

    #[test]
    fn test_calendar_invalid_dates_rejected() {
        assert_eq!(extract_issue_date("31/04/2024"), "");
        assert_eq!(extract_issue_date("29/02/2023"), "");
        assert_eq!(extract_issue_date("29/02/2024"), "29/02/2024");
    }

    #[test]
    fn test_invalid_date_falls_through_to_next_match() {
        assert_eq!(extract_issue_date("31/04/2024 e depois 15/05/2024"), "15/05/2024");
    }

    #[test]
    fn test_labelled_date_wins_over_earlier_bare_date() {
        let text = "Competência 01/01/2024\nData e Hora da Emissão 10/01/2024 14:32";
        assert_eq!(extract_issue_date(text), "10/01/2024");

        let text = "Vencimento 20/02/2024\nEmissão: 05/02/2024";
        assert_eq!(extract_issue_date(text), "05/02/2024");
    }

    #[test]
    fn test_generic_label() {
        let text = "Prazo 30/06/2024\nData: 12.06.2024";
        assert_eq!(extract_issue_date(text), "12/06/2024");
    }

    #[test]
    fn test_no_date() {
        assert_eq!(extract_issue_date("sem data"), "");
        assert!(DateExtractor::new().extract_all("").is_empty());
    }
}
