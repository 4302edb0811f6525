//! Common regex patterns for Brazilian service invoices (NF).
//!
//! Digits are matched as `[0-9]`: `\d` also matches non-ASCII digits.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number
    pub static ref NF_FILENAME: Regex = Regex::new(
        r"(?i)NF[.\s]*([0-9]+)"
    ).unwrap();

    pub static ref NF_LABELLED: Regex = Regex::new(
        r"(?i)n[uú]mero\s+da\s+nota[^0-9]*([0-9]{4,})"
    ).unwrap();

    pub static ref NF_AFTER_NOTA: Regex = Regex::new(
        r"(?i)\bnota\s*[.:]?\s*([0-9]{4,})"
    ).unwrap();

    pub static ref DIGIT_RUN: Regex = Regex::new(
        r"\b[0-9]{4,}\b"
    ).unwrap();

    // Issue date, most specific label first
    pub static ref DATE_EMISSION_LABEL: Regex = Regex::new(
        r"(?i)(?:data\s+e\s+hora\s+da\s+emiss[aã]o?\s*|emiss[aã]o?\s*:\s*)([0-9]{2}/[0-9]{2}/[0-9]{4})"
    ).unwrap();

    pub static ref DATE_GENERIC_LABEL: Regex = Regex::new(
        r"(?i)(?:data\s*:\s*|emiss[aã]o?\s*em\s*)([0-9]{2}[/.\-][0-9]{2}[/.\-][0-9]{4})"
    ).unwrap();

    pub static ref DATE_BARE: Regex = Regex::new(
        r"\b([0-9]{2}[/.\-][0-9]{2}[/.\-][0-9]{4})\b"
    ).unwrap();

    // Purchase orders
    pub static ref PO_FILENAME_TAIL: Regex = Regex::new(
        r"(?i)\bPO\s+([^\n\r]+)"
    ).unwrap();

    pub static ref PO_TOKEN: Regex = Regex::new(
        r"\b[0-9]{6}\b"
    ).unwrap();

    pub static ref PO_BODY: Regex = Regex::new(
        r"(?i)\bPO\s+([0-9]{6})\b"
    ).unwrap();

    // Line items: "PO 100500 LINHA 1 VALOR 1.234,56 / description"
    pub static ref LINE_PRECISE: Regex = Regex::new(
        r"(?i)(?:/)?\s*(?:PO\s+)?(?P<po>[0-9]{6})\s+LINHA\s+(?P<linha>[0-9]+)\s+VALOR\s+(?P<valor>[0-9.,]+)\s*/\s*(?P<descricao>[^\n\r]*)"
    ).unwrap();

    pub static ref LINE_LOOSE: Regex = Regex::new(
        r"(?i)(?:/)?\s*(?:PO\s+)?(?P<po>[0-9]{6})[\s\S]*?(?:linha|item)[\s:]*(?P<linha>[0-9]+)[\s\S]*?(?:valor|vlr?|total)[\s:]*[$R]*(?P<valor>[0-9.,]+)(?:[\s/;-]*(?P<descricao>[^\n\r]*))?"
    ).unwrap();
}
