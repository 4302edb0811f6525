//! Loads an existing workbook's values with calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::{is_po_sheet, CellValue, DataRow, Sheet, SheetContent, FIRST_DATA_ROW};
use crate::error::WorkbookError;

/// Read every sheet of `path`, in workbook order.
///
/// Only `PO_` sheets carry their data rows; other sheets are named only.
pub(crate) fn load(path: &Path) -> Result<Vec<Sheet>, WorkbookError> {
    let load_error = |reason: String| WorkbookError::Load {
        path: path.display().to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| load_error(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let content = if is_po_sheet(&name) {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| load_error(format!("sheet {}: {}", name, e)))?;
            SheetContent::PurchaseOrder {
                rows: data_rows(&range),
            }
        } else {
            SheetContent::Other
        };
        debug!("Loaded sheet {}", name);
        sheets.push(Sheet { name, content });
    }
    Ok(sheets)
}

/// Columns A to E of every row from Excel row 4 to the last used row.
///
/// Blank rows are kept so row indexes match the sheet.
fn data_rows(range: &Range<Data>) -> Vec<DataRow> {
    let Some((last_row, _)) = range.end() else {
        return Vec::new();
    };
    (FIRST_DATA_ROW..=last_row)
        .map(|row| std::array::from_fn(|col| cell(range, row, col as u32)))
        .collect()
}

fn cell(range: &Range<Data>, row: u32, col: u32) -> CellValue {
    range.get_value((row, col)).map(to_cell).unwrap_or_default()
}

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(n) => CellValue::Number(*n),
        Data::String(s) => CellValue::text(s),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => serial_to_date(dt.as_f64())
            .map(CellValue::Text)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// Excel serial date (1900 system) as `dd/mm/yyyy`.
fn serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.trunc() as i64))?;
    Some(date.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_date() {
        assert_eq!(serial_to_date(45292.0).as_deref(), Some("01/01/2024"));
        assert_eq!(serial_to_date(45292.75).as_deref(), Some("01/01/2024"));
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn test_data_rows_keep_inner_blanks() {
        let mut range = Range::new((0, 0), (5, 5));
        range.set_value((3, 0), Data::Float(4521.0));
        range.set_value((5, 5), Data::String("obs".to_string()));

        let rows = data_rows(&range);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], CellValue::Number(4521.0));
        assert!(rows[2].iter().all(CellValue::is_empty));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/POs.xlsx")).unwrap_err();
        assert!(matches!(err, WorkbookError::Load { .. }));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("POs.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(load(&path), Err(WorkbookError::Load { .. })));
    }
}
