//! Brazilian monetary format (`1.234,56`).

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a Brazilian-formatted amount: `.` groups thousands, `,` is the
/// decimal separator.
///
/// Returns `None` for anything that does not normalize to a plain number,
/// e.g. `12,,3`.
pub fn parse_brl_amount(raw: &str) -> Option<Decimal> {
    let normalized = raw.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Format an amount the way it is printed on invoices: `R$ 1.234,56`.
pub fn format_brl_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, dec_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, dec_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thousands_and_decimals() {
        assert_eq!(parse_brl_amount("1.234,56"), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(parse_brl_amount("10,00"), Some(Decimal::from_str("10.00").unwrap()));
        assert_eq!(parse_brl_amount("1.000.000"), Some(Decimal::from(1_000_000)));
        assert_eq!(parse_brl_amount("250"), Some(Decimal::from(250)));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_brl_amount("12,,3"), None);
        assert_eq!(parse_brl_amount(""), None);
        assert_eq!(parse_brl_amount("."), None);
        assert_eq!(parse_brl_amount("1,2,3"), None);
    }

    #[test]
    fn test_format_brl_amount() {
        assert_eq!(format_brl_amount(Decimal::from_str("1234.56").unwrap()), "R$ 1.234,56");
        assert_eq!(format_brl_amount(Decimal::from(10)), "R$ 10,00");
        assert_eq!(format_brl_amount(Decimal::from_str("999.5").unwrap()), "R$ 999,50");
        assert_eq!(format_brl_amount(Decimal::from(1_000_000)), "R$ 1.000.000,00");
    }
}
