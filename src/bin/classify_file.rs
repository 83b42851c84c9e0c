//! Classify a CSV / TXT / spreadsheet file from the command line and
//! optionally write the results as CSV or XLSX.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use smart_triggers::classify::remote::build_remote_from_config;
use smart_triggers::export::{to_csv, to_xlsx, Delimiter, TableLayout};
use smart_triggers::ingest::read_upload;
use smart_triggers::tone::summarize;
use smart_triggers::{classify_batch, RemoteConfig, TriggerClassifier, TriggerConfig};

#[derive(Parser)]
#[command(name = "classify-file")]
#[command(about = "Classify short texts from a file into trigger labels", long_about = None)]
struct Cli {
    /// Input file (.csv, .txt, .xlsx, .xls, .ods)
    input: PathBuf,

    /// Output file; format follows the extension (.csv or .xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Trigger taxonomy TOML (default: TRIGGERS_CONFIG_PATH, config/triggers.toml, built-in)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote fallback JSON config (default: REMOTE_CONFIG_PATH, config/remote.json)
    #[arg(long)]
    remote_config: Option<PathBuf>,

    /// CSV output delimiter (comma/semicolon)
    #[arg(short, long, default_value = "comma")]
    delimiter: Delimiter,

    /// Skip the remote fallback entirely
    #[arg(long)]
    local_only: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

enum OutputKind {
    Csv,
    Xlsx,
}

fn output_kind(path: &Path) -> Result<OutputKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(OutputKind::Csv),
        Some("xlsx") => Ok(OutputKind::Xlsx),
        _ => bail!("output must end in .csv or .xlsx: {}", path.display()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .init();

    // fail on a bad output path before doing any work
    let kind = cli.output.as_deref().map(output_kind).transpose()?;

    let triggers = match &cli.config {
        Some(p) => TriggerConfig::load_from_file(p)?,
        None => TriggerConfig::load_default()?,
    };
    let triggers = Arc::new(triggers);

    let classifier = if cli.local_only {
        TriggerClassifier::local_only(triggers)
    } else {
        let remote_cfg = match &cli.remote_config {
            Some(p) => RemoteConfig::load_from_file(p)?,
            None => RemoteConfig::load_default(),
        };
        TriggerClassifier::new(triggers, build_remote_from_config(&remote_cfg))
            .with_remote_timeout(remote_cfg.timeout())
    };

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let name = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let texts = read_upload(name, &bytes)?;
    info!(file = %cli.input.display(), texts = texts.len(), "input decoded");

    let rows = classify_batch(&classifier, texts).await?;

    for r in &rows {
        println!(
            "{:>5}  {:<12} {:>6.2}  {:<12} {}",
            r.id, r.label, r.confidence, r.final_label, r.text
        );
    }

    let summary = classifier
        .config()
        .tone_map()
        .map(|tones| summarize(&rows, tones))
        .unwrap_or_default();
    if !summary.is_empty() {
        println!();
        for b in &summary {
            println!("{:<9} {:>5}  {:>6.2}%", b.tone.as_str(), b.count, b.percent);
        }
    }

    if let (Some(path), Some(kind)) = (&cli.output, kind) {
        let layout = TableLayout::for_config(classifier.config());
        let out = match kind {
            OutputKind::Csv => to_csv(&rows, layout, cli.delimiter)?,
            OutputKind::Xlsx => to_xlsx(&rows, &summary, layout)?,
        };
        std::fs::write(path, out).with_context(|| format!("cannot write {}", path.display()))?;
        println!("\nsaved {} rows to {}", rows.len(), path.display());
    }

    Ok(())
}
