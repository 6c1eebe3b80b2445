//! Ingest configuration
//!
//! Layered, lowest precedence first: built-in defaults, an optional TOML
//! file, `RUC_*` environment variables (a `.env` file is honored), and
//! finally whatever the CLI overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Directory receiving downloaded archives and their extracted contents.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Directory receiving the dataset, quarantine file and store.
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const DEFAULT_DATASET_FILE: &str = "ruc.csv";
pub const DEFAULT_QUARANTINE_FILE: &str = "error.csv";
pub const DEFAULT_STORE_FILE: &str = "ruc.sqlite";

/// Timeout for fetching the page that lists the archives.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single archive download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Maximum bytes written per chunk while downloading.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Rows buffered before the unifier flushes to disk.
pub const DEFAULT_MERGE_BATCH_SIZE: usize = 1000;

/// Rows per insert batch in the loader.
pub const DEFAULT_LOAD_BATCH_SIZE: usize = 1000;

/// Insert batches per store transaction.
pub const DEFAULT_COMMIT_EVERY_BATCHES: usize = 10;

/// How the first line of each flat file is treated while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Discard the first line of every file.
    #[default]
    SkipFirstLine,
    /// Discard a file's first line only when it equals the canonical header.
    SkipMatchingHeader,
    /// Only the first file carries a header; later files are merged whole.
    FirstFileOnly,
}

impl FromStr for HeaderPolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "skip-first-line" => Ok(HeaderPolicy::SkipFirstLine),
            "skip-matching-header" => Ok(HeaderPolicy::SkipMatchingHeader),
            "first-file-only" => Ok(HeaderPolicy::FirstFileOnly),
            _ => Err(IngestError::Config(format!("Invalid header policy: {}", s))),
        }
    }
}

impl fmt::Display for HeaderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeaderPolicy::SkipFirstLine => "skip-first-line",
            HeaderPolicy::SkipMatchingHeader => "skip-matching-header",
            HeaderPolicy::FirstFileOnly => "first-file-only",
        };
        f.write_str(name)
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Page listing the archives. Required for a full run only.
    pub source_url: Option<String>,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub dataset_file: String,
    pub quarantine_file: String,
    pub store_file: String,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub chunk_size: usize,
    pub merge_batch_size: usize,
    pub load_batch_size: usize,
    pub commit_every_batches: usize,
    pub header_policy: HeaderPolicy,
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dataset_file: DEFAULT_DATASET_FILE.to_string(),
            quarantine_file: DEFAULT_QUARANTINE_FILE.to_string(),
            store_file: DEFAULT_STORE_FILE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            merge_batch_size: DEFAULT_MERGE_BATCH_SIZE,
            load_batch_size: DEFAULT_LOAD_BATCH_SIZE,
            commit_every_batches: DEFAULT_COMMIT_EVERY_BATCHES,
            header_policy: HeaderPolicy::default(),
            show_progress: false,
        }
    }
}

impl IngestConfig {
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Defaults, then `config_file` if given, then the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let base = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = base.merge_vars(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `RUC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_vars(|key| std::env::var(key).ok())
    }

    /// Read a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            IngestError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply variables from `lookup`; keys that resolve to `None` are left alone.
    pub fn merge_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RUC_SOURCE_URL") {
            self.source_url = Some(url);
        }
        if let Some(dir) = lookup("RUC_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RUC_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("RUC_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("RUC_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("RUC_DOWNLOAD_TIMEOUT_SECS") {
            self.download_timeout_secs = parse_var("RUC_DOWNLOAD_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("RUC_CHUNK_SIZE") {
            self.chunk_size = parse_var("RUC_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("RUC_MERGE_BATCH_SIZE") {
            self.merge_batch_size = parse_var("RUC_MERGE_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("RUC_LOAD_BATCH_SIZE") {
            self.load_batch_size = parse_var("RUC_LOAD_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("RUC_COMMIT_EVERY_BATCHES") {
            self.commit_every_batches = parse_var("RUC_COMMIT_EVERY_BATCHES", &value)?;
        }
        if let Some(value) = lookup("RUC_HEADER_POLICY") {
            self.header_policy = value.parse()?;
        }
        if let Some(value) = lookup("RUC_SHOW_PROGRESS") {
            self.show_progress = parse_var("RUC_SHOW_PROGRESS", &value)?;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(IngestError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.download_timeout_secs <= self.request_timeout_secs {
            return Err(IngestError::Config(format!(
                "Download timeout ({}s) must be greater than request timeout ({}s)",
                self.download_timeout_secs, self.request_timeout_secs
            )));
        }

        for (name, value) in [
            ("chunk_size", self.chunk_size),
            ("merge_batch_size", self.merge_batch_size),
            ("load_batch_size", self.load_batch_size),
            ("commit_every_batches", self.commit_every_batches),
        ] {
            if value == 0 {
                return Err(IngestError::Config(format!("{} must be greater than 0", name)));
            }
        }

        for (name, value) in [
            ("dataset_file", &self.dataset_file),
            ("quarantine_file", &self.quarantine_file),
            ("store_file", &self.store_file),
        ] {
            if value.trim().is_empty() {
                return Err(IngestError::Config(format!("{} cannot be empty", name)));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset_file)
    }

    pub fn quarantine_path(&self) -> PathBuf {
        self.data_dir.join(&self.quarantine_file)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.config.source_url = Some(url.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn merge_batch_size(mut self, size: usize) -> Self {
        self.config.merge_batch_size = size;
        self
    }

    pub fn load_batch_size(mut self, size: usize) -> Self {
        self.config.load_batch_size = size;
        self
    }

    pub fn commit_every_batches(mut self, batches: usize) -> Self {
        self.config.commit_every_batches = batches;
        self
    }

    pub fn header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.config.header_policy = policy;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<IngestConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
