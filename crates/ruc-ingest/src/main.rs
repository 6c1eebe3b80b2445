//! RUC Ingest - builds the RUC store from published archives

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ruc_common::logging::{init_logging, LogConfig, LogLevel};
use ruc_ingest::{HeaderPolicy, IngestConfig, IngestPipeline, PipelineReport};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ruc-ingest")]
#[command(author, version, about = "RUC registry ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for downloaded and extracted archives
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory for the dataset, quarantine file and store
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// How the first line of each flat file is treated
    #[arg(long, global = true)]
    header_policy: Option<HeaderPolicy>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover, download, extract, merge, validate and load
    Run {
        /// Listing page URL (falls back to RUC_SOURCE_URL or the config file)
        url: Option<String>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Show download progress bars (default: when stderr is a terminal)
        #[arg(long)]
        progress: Option<bool>,
    },

    /// Merge already extracted flat files into the dataset
    Unify,

    /// Validate the dataset and quarantine malformed rows
    Validate,

    /// Rebuild the store from the dataset
    Load,
}

impl Cli {
    fn ingest_config(&self) -> Result<IngestConfig> {
        let mut config = IngestConfig::load(self.config.as_deref())?;

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(policy) = self.header_policy {
            config.header_policy = policy;
        }
        if let Command::Run { url, progress, .. } = &self.command {
            if let Some(url) = url {
                config.source_url = Some(url.clone());
            }
            config.show_progress = progress.unwrap_or_else(|| std::io::stderr().is_terminal());
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // LOG_* variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ruc-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = cli.ingest_config()?;
    let pipeline = IngestPipeline::new(config)?;

    match cli.command {
        Command::Run { report, .. } => run(&pipeline, report.as_deref()).await?,
        Command::Unify => {
            let outcome = pipeline.unify().await?;
            println!("Rows merged:      {}", outcome.rows);
            println!("Files scanned:    {}", outcome.files_scanned);
            println!("Files skipped:    {}", outcome.files_skipped);
            println!("Dataset:          {}", outcome.path.display());
        },
        Command::Validate => {
            let report = pipeline.validate().await?;
            println!("Rows kept:        {}", report.rows_kept);
            println!("Rows quarantined: {}", report.rows_quarantined);
            if let Some(path) = report.quarantine_path {
                println!("Quarantine:       {}", path.display());
            }
        },
        Command::Load => {
            let rows = pipeline.load().await?;
            println!("Rows loaded:      {}", rows);
            println!("Store:            {}", pipeline.config().store_path().display());
        },
    }

    Ok(())
}

async fn run(pipeline: &IngestPipeline, report_path: Option<&Path>) -> Result<()> {
    let url = pipeline.config().source_url.clone().context(
        "A listing page URL is required: pass it as an argument, set RUC_SOURCE_URL, \
         or set source_url in the config file",
    )?;

    let mut report = PipelineReport::new(Some(url.clone()));
    let result = pipeline.run_into(&url, &mut report).await;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    println!("{}", "=".repeat(50));
    println!("Archives found:      {}", report.found);
    println!("Archives downloaded: {}", report.downloaded);
    println!("Archives extracted:  {}", report.extracted);
    println!("Rows merged:         {}", report.rows_merged);
    println!("Rows quarantined:    {}", report.rows_quarantined);
    println!("Rows loaded:         {}", report.rows_loaded);
    println!("{}", "=".repeat(50));

    if let Err(e) = result {
        error!(error = %e, "Ingestion failed");
        return Err(e.into());
    }

    info!("Ingestion complete");
    Ok(())
}
