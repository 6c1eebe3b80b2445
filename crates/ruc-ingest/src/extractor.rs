//! Archive extraction
//!
//! An archive `<dir>/<stem>.zip` is unpacked into `<dir>/<stem>/` and then
//! deleted. A corrupt archive is left where it is.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{IngestError, Result};
use crate::fetcher::FetchedArchive;

/// Where an archive's contents ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArchive {
    pub dir: PathBuf,
    pub entries: usize,
}

/// Directory an archive extracts into: a sibling named after its stem.
pub fn extraction_dir(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "archive".into());

    match archive_path.parent() {
        Some(parent) => parent.join(stem),
        None => PathBuf::from(stem),
    }
}

/// Extract a downloaded archive, consuming it.
///
/// Runs on the blocking pool.
pub async fn extract(archive: FetchedArchive) -> Result<ExtractedArchive> {
    let path = archive.path;
    tokio::task::spawn_blocking(move || extract_file(&path)).await?
}

/// Extract the archive at `path` and delete it on success.
pub fn extract_file(path: &Path) -> Result<ExtractedArchive> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(archive = %name, "Extracting");

    let dir = extraction_dir(path);
    let entries = unpack(path, &dir).map_err(|e| {
        error!(archive = %name, error = %e, "Extraction failed, archive kept");
        e
    })?;

    std::fs::remove_file(path)?;
    info!(archive = %name, dir = %dir.display(), entries, "Extracted");

    Ok(ExtractedArchive { dir, entries })
}

fn unpack(path: &Path, dir: &Path) -> Result<usize> {
    let file = File::open(path)?;
    let mut zip = ZipArchive::new(file).map_err(|e| classify(path, e))?;
    let entries = zip.len();

    std::fs::create_dir_all(dir)?;
    // entry names escaping `dir` are rejected by the zip crate
    zip.extract(dir).map_err(|e| classify(path, e))?;

    Ok(entries)
}

fn classify(path: &Path, err: ZipError) -> IngestError {
    match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            IngestError::CorruptArchive {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        },
        other => IngestError::Archive(other),
    }
}
