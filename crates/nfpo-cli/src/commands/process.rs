//! Process command - classify a single invoice PDF.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use nfpo_core::invoice::rules::format_brl_amount;
use nfpo_core::{Classification, DocumentProcessor, TextSource};

use super::{load_config, BarObserver};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip the OCR fallback and use only embedded PDF text
    #[arg(long)]
    text_only: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let is_pdf = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        anyhow::bail!("Not a PDF file: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let processor = DocumentProcessor::from_config(&config).with_text_only(args.text_only);
    let classification = processor.classify_with(&args.input, &BarObserver::new(&pb));
    pb.finish_and_clear();

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&classification)?,
        OutputFormat::Text => format_text(&classification),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_text(classification: &Classification) -> String {
    let result = &classification.result;
    let mut output = String::new();

    output.push_str(&format!("NF:      {}\n", or_dash(&result.invoice_number)));
    output.push_str(&format!("Emissão: {}\n", or_dash(&result.issue_date)));
    let status = result.status.to_string().to_uppercase();
    let status = if result.status.is_success() {
        style(status).green()
    } else {
        style(status).red()
    };
    output.push_str(&format!("Status:  {}\n", status));
    output.push_str(&format!("Fonte:   {}\n", describe_source(&classification.source)));

    if result.lines.is_empty() {
        output.push_str("\nNo line items found\n");
    } else {
        output.push_str("\nLines:\n");
        for item in &result.lines {
            let mark = if item.processed { style("✓").green() } else { style("✗").red() };
            output.push_str(&format!(
                "  {} PO {}  line {:<4} {:>16}  {}\n",
                mark,
                or_dash(&item.po),
                or_dash(&item.line),
                format_brl_amount(item.value),
                item.description
            ));
        }
    }

    output.push_str(&format!("\nTime: {}ms\n", classification.elapsed_ms));
    output
}

fn describe_source(source: &TextSource) -> String {
    match source {
        TextSource::Direct => "PDF text".to_string(),
        TextSource::DirectOnly => "PDF text (OCR disabled)".to_string(),
        TextSource::Ocr { tiers, complete } => {
            let tiers: Vec<String> = tiers.iter().map(u32::to_string).collect();
            let suffix = if *complete { "" } else { ", incomplete" };
            format!("OCR at {} DPI{}", tiers.join("/"), suffix)
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
