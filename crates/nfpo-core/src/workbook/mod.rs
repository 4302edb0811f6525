//! Per-PO workbook aggregation.
//!
//! A new workbook is written in full with rust_xlsxwriter. An existing one is
//! read with calamine to find data rows and duplicates, then edited in place
//! with edit_xlsx so cells, formulas and fills outside the appended rows are
//! kept. Sheet order is restored afterwards by rewriting `xl/workbook.xml`.

mod order;
mod reader;
mod styles;
mod writer;

pub use writer::{MergeReport, WorkbookAggregator};

/// Title of the second header row.
pub const SECTION_TITLE: &str = "DESCRIÇÃO DE SERVIÇOS";

/// Column headers of the third header row.
pub const COLUMN_HEADERS: [&str; 5] = ["N. Nota", "Data", "Linha da PO", "Descrição", "Valor"];

/// Zero-based index of the first data row (Excel row 4).
pub const FIRST_DATA_ROW: u32 = 3;

const SHEET_PREFIX: &str = "PO_";

/// A single cell value as stored in the workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Text cell; an empty string is an empty cell.
    pub fn text(text: &str) -> Self {
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text.to_string())
        }
    }

    /// Digit strings become numbers, anything else stays text.
    pub fn integer_or_text(text: &str) -> Self {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = text.parse::<u64>() {
                return Self::Number(n as f64);
            }
        }
        Self::text(text)
    }
}

/// The five data columns of a PO sheet.
pub type DataRow = [CellValue; 5];

/// Fill of a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShade {
    /// Even Excel row, no fill.
    Plain,
    /// Odd Excel row, light blue.
    Banded,
    /// Has a later identical row, yellow.
    Duplicated,
    /// Repeats an earlier row, red.
    NewDuplicate,
}

impl RowShade {
    /// Fill colour as `0xRRGGBB`.
    pub fn fill(self) -> Option<u32> {
        match self {
            Self::Plain => None,
            Self::Banded => Some(0xBDD7EE),
            Self::Duplicated => Some(0xFFFF99),
            Self::NewDuplicate => Some(0xFF9999),
        }
    }

    /// Alternating shade of the data row at `index`.
    pub fn parity(index: usize) -> RowShade {
        if (FIRST_DATA_ROW as usize + index + 1) % 2 == 1 {
            RowShade::Banded
        } else {
            RowShade::Plain
        }
    }
}

/// A data row written at `index` (0 is Excel row 4) with a fill.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RowWrite {
    pub index: usize,
    pub row: DataRow,
    pub shade: RowShade,
}

impl RowWrite {
    /// 1-based Excel row number.
    pub fn excel_row(&self) -> u32 {
        FIRST_DATA_ROW + self.index as u32 + 1
    }
}

/// Cell writes for one sheet, applied in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SheetPlan {
    pub writes: Vec<RowWrite>,
    pub appended: usize,
    pub duplicates: usize,
}

/// Plan appending `incoming` below `existing`.
///
/// A row equal to an earlier one is appended as [`RowShade::NewDuplicate`]
/// and the first earlier copy is rewritten as [`RowShade::Duplicated`].
/// Blank rows never match.
pub(crate) fn plan_rows(existing: &[DataRow], incoming: &[DataRow]) -> SheetPlan {
    let mut rows = existing.to_vec();
    let mut plan = SheetPlan::default();

    for row in incoming {
        let blank = row.iter().all(CellValue::is_empty);
        let first = if blank { None } else { rows.iter().position(|r| r == row) };

        let shade = match first {
            Some(index) => {
                let flagged = plan
                    .writes
                    .iter()
                    .any(|w| w.index == index && w.shade == RowShade::Duplicated);
                if !flagged {
                    plan.writes.push(RowWrite {
                        index,
                        row: rows[index].clone(),
                        shade: RowShade::Duplicated,
                    });
                }
                plan.duplicates += 1;
                RowShade::NewDuplicate
            }
            None => RowShade::parity(rows.len()),
        };

        plan.writes.push(RowWrite {
            index: rows.len(),
            row: row.clone(),
            shade,
        });
        plan.appended += 1;
        rows.push(row.clone());
    }
    plan
}

/// A worksheet of an existing workbook.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sheet {
    pub name: String,
    pub content: SheetContent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SheetContent {
    /// `PO_<digits>` sheet: fixed header block plus data rows.
    PurchaseOrder { rows: Vec<DataRow> },
    /// Any other sheet. Left untouched.
    Other,
}

/// Sheet name of a purchase order.
pub fn sheet_name(po: &str) -> String {
    format!("{}{}", SHEET_PREFIX, po)
}

/// `PO_<digits>` names hold purchase-order data.
pub(crate) fn is_po_sheet(name: &str) -> bool {
    name.strip_prefix(SHEET_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Ordering key: the number after `PO_`, or 0 for anything else.
pub(crate) fn sort_key(name: &str) -> u64 {
    name.strip_prefix(SHEET_PREFIX)
        .and_then(|rest| rest.parse().ok())
        .unwrap_or(0)
}
