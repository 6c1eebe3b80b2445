//! Archive download

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use regex::RegexBuilder;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::discovery::{is_valid_url, USER_AGENT};
use crate::error::{IngestError, Result};

/// Name used when a URL yields nothing usable.
pub const PLACEHOLDER_FILENAME: &str = "downloaded_file.zip";

/// An archive on local disk, waiting to be extracted.
///
/// The extractor takes this by value and deletes the file once its contents
/// are out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub url: Url,
    pub path: PathBuf,
    pub size: u64,
}

/// Local file name for an archive URL.
///
/// Prefers the first `<name>.zip` token anywhere in the URL (so
/// `.../ruc0.zip/download` gives `ruc0.zip`), then the last path segment
/// with `.zip` appended, then [`PLACEHOLDER_FILENAME`].
pub fn derive_filename(url: &str) -> String {
    let token = RegexBuilder::new(r"([^/]+\.zip)")
        .case_insensitive(true)
        .build()
        .ok()
        .and_then(|re| re.find(url).map(|m| m.as_str().to_string()));

    if let Some(name) = token {
        return name;
    }

    let segment = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });

    match segment {
        Some(name) if !name.is_empty() => {
            if name.ends_with(".zip") {
                name
            } else {
                format!("{}.zip", name)
            }
        },
        _ => PLACEHOLDER_FILENAME.to_string(),
    }
}

/// Downloads archives into a target directory
pub struct ArchiveFetcher {
    client: Client,
    target_dir: PathBuf,
    chunk_size: usize,
    show_progress: bool,
}

impl ArchiveFetcher {
    pub fn new(download_timeout: Duration, target_dir: impl Into<PathBuf>, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be greater than 0".to_string()));
        }

        let client = Client::builder()
            .timeout(download_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            target_dir: target_dir.into(),
            chunk_size,
            show_progress: false,
        })
    }

    /// Draw a progress bar per download.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Download one archive, overwriting any file of the same name.
    ///
    /// A failed transfer leaves whatever was written on disk.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedArchive> {
        if !is_valid_url(url) {
            return Err(IngestError::InvalidUrl {
                url: url.to_string(),
                reason: "expected http(s) with a host".to_string(),
            });
        }
        let parsed = Url::parse(url).map_err(|e| IngestError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!(url = %parsed, "Starting download");
        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                url: parsed.to_string(),
                status: status.as_u16(),
            });
        }

        let filename = derive_filename(url);
        let path = self.target_dir.join(&filename);
        tokio::fs::create_dir_all(&self.target_dir).await?;

        let pb = self.progress_bar(response.content_length(), &filename);

        match self.write_body(response, &path, &pb).await {
            Ok(size) => {
                pb.finish_and_clear();
                info!(file = %filename, kb = size as f64 / 1024.0, "Download complete");
                Ok(FetchedArchive {
                    url: parsed,
                    path,
                    size,
                })
            },
            Err(e) => {
                // the partial file stays; the next run overwrites it
                pb.abandon();
                warn!(path = %path.display(), error = %e, "Download interrupted");
                Err(e)
            },
        }
    }

    async fn write_body(&self, response: reqwest::Response, path: &Path, pb: &ProgressBar) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(self.chunk_size).filter(|p| !p.is_empty()) {
                file.write_all(piece).await?;
                written += piece.len() as u64;
            }
            pb.set_position(written);
        }

        file.flush().await?;
        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>, filename: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total.unwrap_or(0));
        match ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => warn!(error = %e, "Invalid progress template, using default"),
        }
        pb.set_message(format!("Downloading {}", filename));
        pb
    }
}
