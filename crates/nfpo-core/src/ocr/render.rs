//! Page rasterization through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

use image::DynamicImage;
use tracing::{debug, trace};

use super::{PageRenderer, Result};
use crate::error::OcrError;
use crate::models::config::OcrConfig;

const PAGE_PREFIX: &str = "page";

/// Renders PDF pages to grayscale PNGs with `pdftoppm`.
///
/// The page count comes from `pdfinfo`, and pages are split into contiguous
/// ranges, one `pdftoppm` process per worker thread. When `pdfinfo` cannot
/// count the pages, a single `pdftoppm` call renders the whole document.
pub struct PdftoppmRenderer {
    command: PathBuf,
    pdfinfo: PathBuf,
    threads: usize,
}

impl PdftoppmRenderer {
    /// `pdfinfo` is looked up next to `command`.
    pub fn new(command: impl Into<PathBuf>) -> Self {
        let command = command.into();
        let pdfinfo = match command.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join("pdfinfo"),
            _ => PathBuf::from("pdfinfo"),
        };
        Self {
            command,
            pdfinfo,
            threads: 1,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.pdftoppm_cmd())
            .with_pdfinfo(config.pdfinfo_cmd())
            .with_threads(config.render_threads)
    }

    pub fn with_pdfinfo(mut self, pdfinfo: impl Into<PathBuf>) -> Self {
        self.pdfinfo = pdfinfo.into();
        self
    }

    /// Set the number of rendering workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Page count reported by `pdfinfo`, if it can read the document.
    fn page_count(&self, path: &Path) -> Option<u32> {
        let output = match Command::new(&self.pdfinfo).arg(path).output() {
            Ok(output) => output,
            Err(e) => {
                debug!("Cannot run {}: {}", self.pdfinfo.display(), e);
                return None;
            }
        };
        if !output.status.success() {
            debug!(
                "pdfinfo failed on {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }
        parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout))
    }

    /// Render `pages` (first, last), or every page when `None`.
    fn run_pdftoppm(&self, path: &Path, dpi: u32, pages: Option<(u32, u32)>, out_prefix: &Path) -> Result<()> {
        let mut command = Command::new(&self.command);
        command.arg("-r").arg(dpi.to_string()).arg("-gray").arg("-png");
        if let Some((first, last)) = pages {
            trace!("pdftoppm pages {}-{} at {} DPI", first, last, dpi);
            command.arg("-f").arg(first.to_string()).arg("-l").arg(last.to_string());
        } else {
            trace!("pdftoppm all pages at {} DPI", dpi);
        }

        let output = command
            .arg(path)
            .arg(out_prefix)
            .output()
            .map_err(|source| OcrError::Spawn {
                tool: self.command.display().to_string(),
                source,
            })?;
        check_status("pdftoppm", &output)
    }
}

fn check_status(tool: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::ToolFailed {
        tool: tool.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// The `Pages:` line of `pdfinfo` output.
fn parse_pdfinfo_pages(info: &str) -> Option<u32> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|n| n.trim().parse().ok())
        .filter(|&n| n > 0)
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
        let temp_dir = tempfile::Builder::new().prefix("nfpo_render_").tempdir()?;
        let out_prefix = temp_dir.path().join(PAGE_PREFIX);

        match self.page_count(path) {
            Some(pages) => {
                let ranges = page_ranges(pages, self.threads);
                debug!(
                    "Rendering {} pages at {} DPI with {} worker(s)",
                    pages,
                    dpi,
                    ranges.len()
                );

                thread::scope(|scope| {
                    let workers: Vec<_> = ranges
                        .iter()
                        .map(|&range| {
                            let out_prefix = &out_prefix;
                            scope.spawn(move || self.run_pdftoppm(path, dpi, Some(range), out_prefix))
                        })
                        .collect();

                    workers.into_iter().try_for_each(|worker| {
                        worker
                            .join()
                            .unwrap_or_else(|_| Err(OcrError::InvalidImage("render worker panicked".to_string())))
                    })
                })?;
            }
            None => {
                debug!("Page count unknown, rendering {} in one pass at {} DPI", path.display(), dpi);
                self.run_pdftoppm(path, dpi, None, &out_prefix)?;
            }
        }

        let images = collect_pages(temp_dir.path())?
            .into_iter()
            .map(|(_, file)| {
                image::open(&file).map_err(|e| OcrError::InvalidImage(format!("{}: {}", file.display(), e)))
            })
            .collect::<Result<Vec<_>>>()?;

        if images.is_empty() {
            return Err(OcrError::NoPages { dpi });
        }
        Ok(images)
    }
}

/// Split pages `1..=pages` into at most `workers` contiguous ranges.
fn page_ranges(pages: u32, workers: usize) -> Vec<(u32, u32)> {
    if pages == 0 {
        return Vec::new();
    }
    let workers = (workers.max(1) as u32).min(pages);
    let per_worker = pages.div_ceil(workers);

    (0..workers)
        .map(|i| (i * per_worker + 1, ((i + 1) * per_worker).min(pages)))
        .filter(|(first, last)| first <= last)
        .collect()
}

/// Rendered page files sorted by page number (`page-01.png` -> 1).
fn collect_pages(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let number = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| stem.rsplit_once('-'))
            .and_then(|(_, n)| n.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_ranges() {
        assert_eq!(page_ranges(1, 2), vec![(1, 1)]);
        assert_eq!(page_ranges(5, 2), vec![(1, 3), (4, 5)]);
        assert_eq!(page_ranges(4, 4), vec![(1, 1), (2, 2), (3, 3), (4, 4)]);
        assert!(page_ranges(0, 2).is_empty());
    }

    #[test]
    fn test_collect_pages_sorted_by_number() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-02.png", "page-1.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages: Vec<u32> = collect_pages(dir.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(pages, vec![1, 2, 10]);
    }

    #[test]
    fn test_parse_pdfinfo_pages() {
        let info = "Producer:       scanner\nEncrypted:      no\nPages:          3\nPage size:      595 x 842 pts (A4)\n";
        assert_eq!(parse_pdfinfo_pages(info), Some(3));
        assert_eq!(parse_pdfinfo_pages("Pages: 0\n"), None);
        assert_eq!(parse_pdfinfo_pages("Syntax Error: Couldn't read xref table\n"), None);
    }

    #[test]
    fn test_pdfinfo_next_to_pdftoppm() {
        let renderer = PdftoppmRenderer::new("/opt/poppler/bin/pdftoppm");
        assert_eq!(renderer.pdfinfo, PathBuf::from("/opt/poppler/bin/pdfinfo"));
        assert_eq!(PdftoppmRenderer::new("pdftoppm").pdfinfo, PathBuf::from("pdfinfo"));
    }

    #[test]
    fn test_unknown_page_count_still_runs_pdftoppm() {
        let dir = tempfile::tempdir().unwrap();
        let pdftoppm = dir.path().join("missing-pdftoppm");
        let renderer = PdftoppmRenderer::new(&pdftoppm).with_pdfinfo(dir.path().join("missing-pdfinfo"));

        // pdfinfo is missing, so the single-pass fallback runs
        let err = renderer.render(Path::new("/nonexistent/doc.pdf"), 300).unwrap_err();
        match err {
            OcrError::Spawn { tool, .. } => assert_eq!(tool, pdftoppm.display().to_string()),
            other => panic!("expected a spawn error, got {:?}", other),
        }
    }
}
