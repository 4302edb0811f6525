//! Reorders the sheet tabs of a saved workbook.
//!
//! Tab order lives in the `<sheets>` list of `xl/workbook.xml`. Relationship
//! ids stay attached to their `<sheet>` entries, so moving the entries is
//! enough; every other part of the archive is copied unchanged.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::sort_key;
use crate::error::WorkbookError;

const WORKBOOK_PART: &str = "xl/workbook.xml";

lazy_static! {
    static ref SHEETS_BLOCK: Regex = Regex::new(r"(?s)(<sheets>)(.*?)(</sheets>)").unwrap();
    static ref SHEET_ENTRY: Regex =
        Regex::new(r"(?s)<sheet\b[^>]*?(?:/>|>\s*</sheet>)").unwrap();
    static ref SHEET_NAME: Regex = Regex::new(r#"\bname\s*=\s*["']([^"']*)["']"#).unwrap();
}

/// Sort the tabs of `path` by [`sort_key`]. Returns `true` if the file changed.
pub(crate) fn sort_sheets(path: &Path) -> Result<bool, WorkbookError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let mut xml = String::new();
    archive.by_name(WORKBOOK_PART)?.read_to_string(&mut xml)?;

    let Some(sorted) = sorted_workbook_xml(&xml) else {
        return Ok(false);
    };
    if sorted == xml {
        return Ok(false);
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut zip_writer = ZipWriter::new(temp.as_file_mut());
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            zip_writer.start_file(name.as_str(), opts)?;
            if name == WORKBOOK_PART {
                zip_writer.write_all(sorted.as_bytes())?;
            } else {
                zip_writer.write_all(&data)?;
            }
        }
        zip_writer.finish()?;
    }

    temp.persist(path).map_err(|e| WorkbookError::Io(e.error))?;
    debug!("Sorted sheets of {}", path.display());
    Ok(true)
}

/// `workbook.xml` with its `<sheet>` entries in PO order.
///
/// `None` when the list cannot be rearranged safely.
fn sorted_workbook_xml(xml: &str) -> Option<String> {
    if xml.contains("localSheetId") {
        warn!("Workbook has sheet-scoped names, keeping sheet order");
        return None;
    }

    let block = SHEETS_BLOCK.captures(xml)?;
    let inner = block.get(2)?.as_str();

    let mut entries: Vec<(u64, &str)> = SHEET_ENTRY
        .find_iter(inner)
        .map(|m| {
            let name = SHEET_NAME
                .captures(m.as_str())
                .and_then(|c| c.get(1))
                .map_or("", |n| n.as_str());
            (sort_key(name), m.as_str())
        })
        .collect();
    if entries.is_empty() {
        warn!("No sheet entries found in {}", WORKBOOK_PART);
        return None;
    }
    entries.sort_by_key(|(key, _)| *key);

    let list: String = entries.iter().map(|(_, entry)| *entry).collect();
    Some(
        SHEETS_BLOCK
            .replace(xml, |c: &Captures| format!("{}{}{}", &c[1], list, &c[3]))
            .into_owned(),
    )
}
