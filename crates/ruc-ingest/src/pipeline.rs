//! End-to-end ingestion run
//!
//! discover → (fetch → extract)* → unify → validate → load
//!
//! Each run gets its own `ingest_run` span carrying a fresh `run_id`; every
//! component log emitted during the run, including work moved onto the
//! blocking pool, is recorded inside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::discovery::LinkDiscoverer;
use crate::error::Result;
use crate::extractor;
use crate::fetcher::ArchiveFetcher;
use crate::loader::StoreLoader;
use crate::unifier::{RecordUnifier, UnifyOutcome};
use crate::validator::{RecordValidator, ValidationReport};

/// Counts and artifacts of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub source_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub found: usize,
    pub downloaded: usize,
    pub extracted: usize,
    pub rows_merged: usize,
    pub rows_quarantined: usize,
    pub rows_loaded: u64,
    pub dataset_path: Option<PathBuf>,
    pub quarantine_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
}

impl PipelineReport {
    pub fn new(source_url: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source_url,
            started_at: Utc::now(),
            finished_at: None,
            found: 0,
            downloaded: 0,
            extracted: 0,
            rows_merged: 0,
            rows_quarantined: 0,
            rows_loaded: 0,
            dataset_path: None,
            quarantine_path: None,
            store_path: None,
        }
    }

    fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// Sequences the ingest components for one configuration
pub struct IngestPipeline {
    config: IngestConfig,
    discoverer: LinkDiscoverer,
    fetcher: ArchiveFetcher,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;

        let discoverer = LinkDiscoverer::new(config.request_timeout())?;
        let fetcher = ArchiveFetcher::new(config.download_timeout(), &config.output_dir, config.chunk_size)?
            .with_progress(config.show_progress);

        Ok(Self {
            config,
            discoverer,
            fetcher,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run the whole pipeline against `page_url`.
    pub async fn run(&self, page_url: &str) -> Result<PipelineReport> {
        let mut report = PipelineReport::new(Some(page_url.to_string()));
        self.run_into(page_url, &mut report).await?;
        Ok(report)
    }

    /// Run the whole pipeline, recording progress into `report` as it goes.
    ///
    /// On error `report` holds the counts reached before the failure.
    pub async fn run_into(&self, page_url: &str, report: &mut PipelineReport) -> Result<()> {
        let span = info_span!("ingest_run", run_id = %report.run_id);

        let result = self.run_stages(page_url, report).instrument(span.clone()).await;
        report.finish();

        span.in_scope(|| match &result {
            Ok(()) => info!(
                found = report.found,
                downloaded = report.downloaded,
                extracted = report.extracted,
                rows_merged = report.rows_merged,
                rows_quarantined = report.rows_quarantined,
                rows_loaded = report.rows_loaded,
                "Run complete"
            ),
            Err(e) => warn!(
                error = %e,
                found = report.found,
                downloaded = report.downloaded,
                extracted = report.extracted,
                rows_merged = report.rows_merged,
                "Run aborted"
            ),
        });

        result
    }

    async fn run_stages(&self, page_url: &str, report: &mut PipelineReport) -> Result<()> {
        info!(url = %page_url, "Starting ingest run");

        let links = self.discoverer.discover(page_url).await;
        report.found = links.len();
        if links.is_empty() {
            warn!(url = %page_url, "No archive links found, nothing to do");
            return Ok(());
        }

        for link in &links {
            let archive = match self.fetcher.fetch(link.as_str()).await {
                Ok(archive) => archive,
                Err(e) => {
                    warn!(url = %link, error = %e, "Download failed, skipping");
                    continue;
                },
            };
            report.downloaded += 1;

            match extractor::extract(archive).await {
                Ok(_) => report.extracted += 1,
                Err(e) => warn!(url = %link, error = %e, "Extraction failed, skipping"),
            }
        }

        let merged = self.unify().await?;
        report.rows_merged = merged.rows;
        report.dataset_path = Some(merged.path);

        let validation = self.validate().await?;
        report.rows_quarantined = validation.rows_quarantined;
        report.quarantine_path = validation.quarantine_path;

        report.rows_loaded = self.load().await?;
        report.store_path = Some(self.config.store_path());

        Ok(())
    }

    /// Merge everything under the output directory into the dataset.
    pub async fn unify(&self) -> Result<UnifyOutcome> {
        let unifier = RecordUnifier::new(self.config.merge_batch_size, self.config.header_policy);
        let root = self.config.output_dir.clone();
        let output = self.config.dataset_path();
        let span = Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            unifier.unify(&root, &output)
        })
        .await?
    }

    /// Validate the dataset in place, quarantining malformed rows.
    pub async fn validate(&self) -> Result<ValidationReport> {
        let validator = RecordValidator::new(self.config.quarantine_file.clone());
        let dataset = self.config.dataset_path();
        let span = Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            validator.validate(&dataset)
        })
        .await?
    }

    /// Rebuild the store from the dataset.
    pub async fn load(&self) -> Result<u64> {
        StoreLoader::new(self.config.load_batch_size, self.config.commit_every_batches)
            .load(&self.config.dataset_path(), &self.config.store_path())
            .await
    }
}
