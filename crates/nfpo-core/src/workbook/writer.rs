//! Merges an aggregate into the workbook.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use edit_xlsx::{WorkSheet, WorkSheetCol, WorkSheetRow, Write};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::{debug, error, info};

use super::styles::{self, EditStyles, SheetStyles, COLUMN_LETTERS};
use super::{
    is_po_sheet, order, plan_rows, reader, sheet_name, sort_key, CellValue, DataRow, RowWrite, Sheet,
    SheetContent, SheetPlan, COLUMN_HEADERS, FIRST_DATA_ROW, SECTION_TITLE,
};
use crate::error::WorkbookError;
use crate::models::document::{Aggregate, SheetRow};

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub path: PathBuf,
    pub sheets_created: usize,
    pub rows_appended: usize,
    /// Appended rows that repeat an existing row.
    pub duplicates: usize,
}

impl MergeReport {
    fn record(&mut self, plan: &SheetPlan) {
        self.rows_appended += plan.appended;
        self.duplicates += plan.duplicates;
    }
}

/// Writes run aggregates into a persistent per-PO workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookAggregator;

impl WorkbookAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Merge and save, logging any failure. Returns `true` on success.
    ///
    /// Not transactional: a failed save leaves the previous file as it was.
    pub fn merge(&self, aggregate: &Aggregate, output_dir: &Path, filename: &str) -> bool {
        match self.try_merge(aggregate, output_dir, filename) {
            Ok(report) => {
                info!(
                    "Saved {} ({} row(s), {} duplicate(s), {} new sheet(s))",
                    report.path.display(),
                    report.rows_appended,
                    report.duplicates,
                    report.sheets_created
                );
                true
            }
            Err(e) => {
                error!("Failed to save workbook {}: {}", output_dir.join(filename).display(), e);
                false
            }
        }
    }

    pub fn try_merge(
        &self,
        aggregate: &Aggregate,
        output_dir: &Path,
        filename: &str,
    ) -> Result<MergeReport, WorkbookError> {
        if let Some((po, _)) = aggregate.iter().find(|(po, _)| !is_po_sheet(&sheet_name(po))) {
            return Err(WorkbookError::InvalidPo(po.clone()));
        }

        let path = output_dir.join(filename);
        let mut report = MergeReport {
            path: path.clone(),
            ..Default::default()
        };

        if path.exists() {
            update(aggregate, &path, &mut report)?;
        } else {
            debug!("Creating new workbook {}", path.display());
            create(aggregate, &path, &mut report)?;
        }
        Ok(report)
    }
}

/// Column coercion of an aggregate row.
pub(crate) fn data_row(row: &SheetRow) -> DataRow {
    [
        CellValue::integer_or_text(&row.invoice_number),
        CellValue::text(&row.issue_date),
        CellValue::integer_or_text(&row.line),
        CellValue::text(&row.description),
        CellValue::Number(row.value.to_f64().unwrap_or(0.0)),
    ]
}

fn data_rows(rows: &[SheetRow]) -> Vec<DataRow> {
    rows.iter().map(data_row).collect()
}

fn edit_error(e: impl Display) -> WorkbookError {
    WorkbookError::Edit(e.to_string())
}

/// Write a new workbook holding only the aggregate, sheets in PO order.
fn create(aggregate: &Aggregate, path: &Path, report: &mut MergeReport) -> Result<(), WorkbookError> {
    let styles = SheetStyles::new();
    let mut workbook = Workbook::new();

    let mut orders: Vec<_> = aggregate.iter().collect();
    orders.sort_by_key(|(po, _)| sort_key(&sheet_name(po)));

    for (po, incoming) in orders {
        let name = sheet_name(po);
        let plan = plan_rows(&[], &data_rows(incoming));

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;
        write_header(worksheet, &name, &styles)?;
        for write in &plan.writes {
            write_row(worksheet, write, &styles)?;
        }

        report.sheets_created += 1;
        report.record(&plan);
    }

    workbook.save(path)?;
    Ok(())
}

/// Append to an existing workbook in place, then restore the sheet order.
fn update(aggregate: &Aggregate, path: &Path, report: &mut MergeReport) -> Result<(), WorkbookError> {
    let sheets = reader::load(path)?;
    let existing = |name: &str| sheets.iter().find(|s| s.name == name);

    let styles = EditStyles::new();
    let mut workbook = edit_xlsx::Workbook::from_path(path).map_err(edit_error)?;

    for (po, incoming) in aggregate.iter() {
        let name = sheet_name(po);
        let (worksheet, mut rows) = match existing(&name) {
            Some(Sheet { content: SheetContent::PurchaseOrder { rows }, .. }) => {
                let worksheet = workbook.get_worksheet_mut_by_name(&name).map_err(edit_error)?;
                (worksheet, rows.clone())
            }
            _ => {
                debug!("Adding sheet {}", name);
                let worksheet = workbook.add_worksheet_by_name(&name).map_err(edit_error)?;
                edit_header(worksheet, &name, &styles)?;
                report.sheets_created += 1;
                (worksheet, Vec::new())
            }
        };

        // Append below anything already in the sheet, not only columns A to E.
        let used = (worksheet.max_row() as usize).saturating_sub(FIRST_DATA_ROW as usize);
        if used > rows.len() {
            rows.resize(used, DataRow::default());
        }

        let plan = plan_rows(&rows, &data_rows(incoming));
        for write in &plan.writes {
            edit_row(worksheet, write, &styles)?;
        }
        report.record(&plan);
    }

    workbook.save_as(path).map_err(edit_error)?;
    order::sort_sheets(path)?;
    Ok(())
}

fn write_header(worksheet: &mut Worksheet, title: &str, styles: &SheetStyles) -> Result<(), XlsxError> {
    let last_col = (COLUMN_HEADERS.len() - 1) as u16;

    worksheet.merge_range(0, 0, 0, last_col, title, &styles.title)?;
    worksheet.merge_range(1, 0, 1, last_col, SECTION_TITLE, &styles.section)?;
    for (col, header) in COLUMN_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(2, col as u16, *header, &styles.header)?;
    }

    worksheet.set_row_height(0, styles::TITLE_HEIGHT)?;
    worksheet.set_row_height(1, styles::SECTION_HEIGHT)?;
    worksheet.set_row_height(2, styles::HEADER_HEIGHT)?;
    for (col, width) in styles::COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

fn write_row(worksheet: &mut Worksheet, write: &RowWrite, styles: &SheetStyles) -> Result<(), XlsxError> {
    let excel_row = write.excel_row() - 1;
    for (col, value) in write.row.iter().enumerate() {
        let format = styles.data(col, write.shade);
        let col = col as u16;
        match value {
            CellValue::Number(n) => worksheet.write_number_with_format(excel_row, col, *n, format)?,
            CellValue::Text(text) => worksheet.write_string_with_format(excel_row, col, text, format)?,
            CellValue::Empty => worksheet.write_blank(excel_row, col, format)?,
        };
    }
    worksheet.set_row_height(excel_row, styles::DATA_HEIGHT)?;
    Ok(())
}

fn edit_header(worksheet: &mut WorkSheet, title: &str, styles: &EditStyles) -> Result<(), WorkbookError> {
    let last = COLUMN_LETTERS[COLUMN_HEADERS.len() - 1];

    worksheet
        .merge_range_with_format(&format!("A1:{}1", last), title, &styles.title)
        .map_err(edit_error)?;
    worksheet
        .merge_range_with_format(&format!("A2:{}2", last), SECTION_TITLE, &styles.section)
        .map_err(edit_error)?;
    for (letter, header) in COLUMN_LETTERS.iter().zip(COLUMN_HEADERS) {
        worksheet
            .write_string_with_format(&format!("{}3", letter), header.to_string(), &styles.header)
            .map_err(edit_error)?;
    }

    worksheet.set_row_height(1, styles::TITLE_HEIGHT).map_err(edit_error)?;
    worksheet.set_row_height(2, styles::SECTION_HEIGHT).map_err(edit_error)?;
    worksheet.set_row_height(3, styles::HEADER_HEIGHT).map_err(edit_error)?;
    for (letter, width) in COLUMN_LETTERS.iter().zip(styles::COLUMN_WIDTHS) {
        worksheet
            .set_columns_width(&format!("{0}:{0}", letter), width)
            .map_err(edit_error)?;
    }
    Ok(())
}

fn edit_row(worksheet: &mut WorkSheet, write: &RowWrite, styles: &EditStyles) -> Result<(), WorkbookError> {
    let excel_row = write.excel_row();
    let format = styles.data(write.shade);
    for (letter, value) in COLUMN_LETTERS.iter().zip(&write.row) {
        let cell_ref = format!("{}{}", letter, excel_row);
        let written = match value {
            CellValue::Number(n) => worksheet.write_with_format(&cell_ref, *n, format),
            CellValue::Text(text) => worksheet.write_string_with_format(&cell_ref, text.clone(), format),
            CellValue::Empty => worksheet.write_string_with_format(&cell_ref, String::new(), format),
        };
        written.map_err(edit_error)?;
    }
    worksheet
        .set_row_height(excel_row, styles::DATA_HEIGHT)
        .map_err(edit_error)?;
    Ok(())
}
