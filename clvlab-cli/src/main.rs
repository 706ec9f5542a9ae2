//! CLVLab CLI — multi-book ingest, evaluation, and model promotion.
//!
//! Commands:
//! - `ingest` — fetch all configured books, gate on data quality, write the
//!   audit record and optionally the merged dataset
//! - `evaluate` — summarize the downstream selection file into the summary
//!   artifact
//! - `promote` — apply the threshold gate to a summary and transition the
//!   model registry on success

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clvlab_core::{summarize, CancelToken, HttpFeedProvider};
use clvlab_runner::audit::JsonFileAuditSink;
use clvlab_runner::registry::FileRegistry;
use clvlab_runner::{
    ingest, load_selection, load_thresholds, read_summary, run_promotion, summary_to_json,
    write_summary, Notifier, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "clvlab", about = "CLVLab CLI — feed ingest and model promotion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured books and run the data-quality gate.
    Ingest {
        /// Pipeline config file.
        #[arg(long, default_value = "pipeline.toml")]
        config: PathBuf,

        /// Where to write the ingest audit record.
        #[arg(long, default_value = "artifacts/ingest_audit.json")]
        audit: PathBuf,

        /// Optional path for the merged dataset artifact.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize a downstream selection file into the summary artifact.
    Evaluate {
        /// Selection CSV produced by the external selection step.
        #[arg(long)]
        input: PathBuf,

        /// Where to write the summary artifact.
        #[arg(long, default_value = "artifacts/summary.json")]
        out: PathBuf,

        /// Pipeline config file (tracked metrics).
        #[arg(long, default_value = "pipeline.toml")]
        config: PathBuf,
    },
    /// Gate a summary against thresholds and transition the registry.
    Promote {
        /// Summary artifact written by `evaluate`.
        #[arg(long, default_value = "artifacts/summary.json")]
        summary: PathBuf,

        /// Threshold config file.
        #[arg(long, default_value = "thresholds.toml")]
        thresholds: PathBuf,

        /// Pipeline config file (primary metric, registry, webhook).
        #[arg(long, default_value = "pipeline.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest { config, audit, out } => cmd_ingest(&config, &audit, out.as_deref()),
        Commands::Evaluate { input, out, config } => cmd_evaluate(&input, &out, &config),
        Commands::Promote {
            summary,
            thresholds,
            config,
        } => cmd_promote(&summary, &thresholds, &config),
    }
}

fn cmd_ingest(
    config_path: &std::path::Path,
    audit_path: &std::path::Path,
    out: Option<&std::path::Path>,
) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let provider = HttpFeedProvider::new(config.request_timeout());
    let sink = JsonFileAuditSink::new(audit_path);

    let output = ingest(
        &config.sources,
        &provider,
        &config.ingest_config(),
        &CancelToken::new(),
        &sink,
    )?;

    println!(
        "Ingested {} rows from {}/{} books ({} advisories). Audit: {}",
        output.dataset.row_count(),
        output.audit.summary.successful,
        output.audit.summary.total_books,
        output.report.advisories.len(),
        audit_path.display()
    );

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&output.dataset)
            .context("failed to serialize dataset")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Dataset written to {}", path.display());
    }
    Ok(())
}

fn cmd_evaluate(
    input: &std::path::Path,
    out: &std::path::Path,
    config_path: &std::path::Path,
) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let selection = load_selection(input, &config.metrics.tracked)?;
    let summaries = summarize(&selection.series, selection.total_rows);
    write_summary(out, &summaries)?;
    println!("{}", serde_json::to_string_pretty(&summary_to_json(&summaries))?);
    Ok(())
}

fn cmd_promote(
    summary_path: &std::path::Path,
    thresholds_path: &std::path::Path,
    config_path: &std::path::Path,
) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let summaries = read_summary(summary_path)?;
    let thresholds = load_thresholds(thresholds_path, &config.metrics.primary)?;
    let registry = FileRegistry::new(&config.registry.path, &config.registry.model_name);
    let notifier = Notifier::new(config.notify.webhook_url.clone());

    let outcome = run_promotion(
        &summaries,
        &config.metrics.primary,
        &thresholds,
        &registry,
        &notifier,
    )?;

    match outcome.version {
        Some(version) => println!(
            "Promoted '{}' version {} (candidate {}).",
            config.registry.model_name, version.version, version.candidate_id
        ),
        None => println!(
            "Held '{}': {}",
            config.registry.model_name,
            outcome.decision.reasons.join("; ")
        ),
    }
    Ok(())
}
