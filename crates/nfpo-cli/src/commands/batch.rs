//! Batch command - process every invoice PDF under a directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use nfpo_core::models::config::BatchConfig;
use nfpo_core::{Aggregate, DocumentProcessor, DocumentStatus, PipelineObserver, WorkbookAggregator};

use super::{load_config, BarObserver};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory searched recursively for PDF files
    #[arg(required = true)]
    input_dir: PathBuf,

    /// Directory of the workbook (default: the input directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Workbook file name
    #[arg(long)]
    xlsx_name: Option<String>,

    /// Only process files whose name contains this term
    #[arg(long)]
    filter: Option<String>,

    /// Skip files whose name contains this term (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Documents processed between pauses
    #[arg(long)]
    batch_size: Option<usize>,

    /// Leave documents where they are instead of routing them
    #[arg(long)]
    no_move: bool,

    /// Skip the OCR fallback and use only embedded PDF text
    #[arg(long)]
    text_only: bool,

    /// Also write summary.csv next to the workbook
    #[arg(long)]
    summary: bool,
}

/// Outcome of one document in the run.
struct FileOutcome {
    path: PathBuf,
    status: DocumentStatus,
    invoice_number: String,
    issue_date: String,
    lines: usize,
    destination: Option<PathBuf>,
}

/// Success and failure counts of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunStats {
    success: usize,
    failure: usize,
}

impl RunStats {
    fn record(&mut self, status: DocumentStatus) {
        match status {
            DocumentStatus::Success => self.success += 1,
            DocumentStatus::Failure => self.failure += 1,
        }
    }

    fn total(&self) -> usize {
        self.success + self.failure
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total() as f64
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    if let Some(filter) = &args.filter {
        config.batch.name_filter = filter.clone();
    }
    config.batch.exclude_terms.extend(args.exclude.iter().cloned());
    if let Some(size) = args.batch_size {
        config.batch.batch_size = size;
    }
    if let Some(name) = &args.xlsx_name {
        config.output.xlsx_filename = name.clone();
    }
    config.validate()?;

    if !args.input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input_dir.display());
    }
    let output_dir = args.output_dir.clone().unwrap_or_else(|| args.input_dir.clone());
    fs::create_dir_all(&output_dir)?;

    let files = collect_pdfs(&args.input_dir, &config.batch)?;
    if files.is_empty() {
        anyhow::bail!("No PDF files found in {}", args.input_dir.display());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );
    let observer = BarObserver::new(&pb);

    let processor = DocumentProcessor::from_config(&config).with_text_only(args.text_only);
    let mut aggregate = Aggregate::new();
    let mut stats = RunStats::default();
    let mut outcomes = Vec::with_capacity(files.len());
    let total = files.len();

    for (batch_index, batch) in files.chunks(config.batch.batch_size).enumerate() {
        for (offset, path) in batch.iter().enumerate() {
            let current = batch_index * config.batch.batch_size + offset + 1;
            observer.progress(current, total);

            let classification = processor.classify_with(path, &observer);
            let result = classification.result;
            stats.record(result.status);
            aggregate.absorb(&result);

            let destination = if args.no_move {
                None
            } else {
                let folder = match result.status {
                    DocumentStatus::Success => &config.batch.processed_dir,
                    DocumentStatus::Failure => &config.batch.review_dir,
                };
                match relocate(path, &args.input_dir.join(folder)) {
                    Ok(target) => Some(target),
                    Err(e) => {
                        warn!("Failed to move {}: {}", path.display(), e);
                        None
                    }
                }
            };

            let mark = if result.status.is_success() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            pb.println(format!(
                "{} [{}/{}] {}",
                mark,
                current,
                total,
                display_name(path)
            ));
            pb.inc(1);

            outcomes.push(FileOutcome {
                path: path.clone(),
                status: result.status,
                invoice_number: result.invoice_number,
                issue_date: result.issue_date,
                lines: result.lines.len(),
                destination,
            });
        }

        let processed = (batch_index + 1) * config.batch.batch_size;
        if processed < total {
            debug!("Pausing {}ms after {} files", config.batch.pause_ms, processed);
            tokio::time::sleep(Duration::from_millis(config.batch.pause_ms)).await;
        }
    }

    pb.finish_with_message("Complete");

    println!();
    let mut workbook_failure = None;
    if aggregate.is_empty() {
        println!(
            "{} No valid line items to export",
            style("⚠").yellow()
        );
    } else {
        let xlsx = &config.output.xlsx_filename;
        if WorkbookAggregator::new().merge(&aggregate, &output_dir, xlsx) {
            println!(
                "{} Workbook updated: {} ({} rows across {} POs)",
                style("✓").green(),
                output_dir.join(xlsx).display(),
                aggregate.row_count(),
                aggregate.po_count()
            );
        } else {
            println!(
                "{} Failed to update workbook {}",
                style("✗").red(),
                output_dir.join(xlsx).display()
            );
            workbook_failure = Some(output_dir.join(xlsx));
        }
    }

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        stats.total(),
        start.elapsed()
    );
    println!(
        "   {} successful ({:.1}%), {} need review ({:.1}%)",
        style(stats.success).green(),
        stats.percent(stats.success),
        style(stats.failure).red(),
        stats.percent(stats.failure)
    );

    if let Some(path) = workbook_failure {
        anyhow::bail!("Workbook {} was not updated", path.display());
    }
    Ok(())
}

/// PDFs under `dir`, sorted, skipping the routing folders.
fn collect_pdfs(dir: &Path, batch: &BatchConfig) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let routed = [dir.join(&batch.processed_dir), dir.join(&batch.review_dir)];

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| !routed.iter().any(|r| p.starts_with(r)))
        .filter(|p| is_candidate(p, batch))
        .collect();
    files.sort();
    Ok(files)
}

/// Name filter and exclusion terms, both case-insensitive.
fn is_candidate(path: &Path, batch: &BatchConfig) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let filter = batch.name_filter.to_lowercase();
    if !filter.is_empty() && !name.contains(&filter) {
        return false;
    }
    !batch
        .exclude_terms
        .iter()
        .map(|t| t.to_lowercase())
        .any(|t| !t.is_empty() && stem.contains(&t))
}

/// Move `path` into `dest_dir`, copying across filesystems.
///
/// An existing file of the same name is kept; the moved file gets a
/// ` (n)` suffix instead.
fn relocate(path: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dest_dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let target = free_target(dest_dir, Path::new(file_name));
    if target.file_name() != Some(file_name) {
        warn!(
            "{} already exists, moving {} as {}",
            dest_dir.join(file_name).display(),
            path.display(),
            target.display()
        );
    }

    if fs::rename(path, &target).is_err() {
        fs::copy(path, &target)?;
        fs::remove_file(path)?;
    }
    debug!("Moved {} to {}", path.display(), target.display());
    Ok(target)
}

/// `dest_dir/name`, or the first `stem (n).ext` not taken yet.
fn free_target(dest_dir: &Path, name: &Path) -> PathBuf {
    let target = dest_dir.join(name);
    if !target.exists() {
        return target;
    }

    let stem = name.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| dest_dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(target)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "issue_date",
        "lines",
        "destination",
    ])?;

    for outcome in outcomes {
        let destination = outcome
            .destination
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        wtr.write_record([
            display_name(&outcome.path).as_str(),
            outcome.status.to_string().as_str(),
            outcome.invoice_number.as_str(),
            outcome.issue_date.as_str(),
            outcome.lines.to_string().as_str(),
            destination.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_config(filter: &str, exclude: &[&str]) -> BatchConfig {
        BatchConfig {
            name_filter: filter.to_string(),
            exclude_terms: exclude.iter().map(|s| s.to_string()).collect(),
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_is_candidate_filter_and_exclusions() {
        let config = batch_config("nf", &["cancelada"]);
        assert!(is_candidate(Path::new("/in/NF 4521.pdf"), &config));
        assert!(!is_candidate(Path::new("/in/boleto.pdf"), &config));
        assert!(!is_candidate(Path::new("/in/NF 4521 CANCELADA.pdf"), &config));
        assert!(is_candidate(Path::new("/in/anything.pdf"), &batch_config("", &[])));
    }

    #[test]
    fn test_collect_pdfs_skips_routed_folders() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::default();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join(&config.processed_dir)).unwrap();
        fs::write(dir.path().join("NF 1.PDF"), b"x").unwrap();
        fs::write(dir.path().join("sub/NF 2.pdf"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join(&config.processed_dir).join("NF 3.pdf"), b"x").unwrap();

        let files = collect_pdfs(dir.path(), &config).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["NF 1.PDF", "NF 2.pdf"]);
    }

    #[test]
    fn test_relocate_creates_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("NF 1.pdf");
        fs::write(&source, b"x").unwrap();

        let target = relocate(&source, &dir.path().join("Precisa Revisar")).unwrap();
        assert!(!source.exists());
        assert!(target.exists());
        assert_eq!(target, dir.path().join("Precisa Revisar").join("NF 1.pdf"));
    }

    #[test]
    fn test_relocate_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Notas Processadas");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("NF 1.pdf"), b"first run").unwrap();
        fs::write(dest.join("NF 1 (1).pdf"), b"second run").unwrap();

        let source = dir.path().join("NF 1.pdf");
        fs::write(&source, b"third run").unwrap();

        let target = relocate(&source, &dest).unwrap();
        assert_eq!(target, dest.join("NF 1 (2).pdf"));
        assert_eq!(fs::read(dest.join("NF 1.pdf")).unwrap(), b"first run");
        assert_eq!(fs::read(&target).unwrap(), b"third run");
        assert!(!source.exists());
    }

    #[test]
    fn test_run_stats_percentages() {
        let mut stats = RunStats::default();
        assert_eq!(stats.percent(0), 0.0);
        stats.record(DocumentStatus::Success);
        stats.record(DocumentStatus::Failure);
        stats.record(DocumentStatus::Failure);
        stats.record(DocumentStatus::Failure);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.percent(stats.success), 25.0);
        assert_eq!(stats.percent(stats.failure), 75.0);
    }
}
