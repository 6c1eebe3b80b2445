//! Column-count validation of the unified dataset
//!
//! Rows whose column count differs from the header's are moved out of the
//! dataset into a quarantine file next to it. The dataset is rewritten in
//! place, so it may differ after validation.

use ruc_common::types::{column_count, ErrorRecord, QUARANTINE_HEADER};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// What validation did to a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub dataset: PathBuf,
    pub expected_columns: usize,
    /// Data rows left in the dataset (header excluded)
    pub rows_kept: usize,
    pub rows_quarantined: usize,
    /// Set only when rows were quarantined
    pub quarantine_path: Option<PathBuf>,
}

/// Split `lines` into the lines to keep and the quarantined records.
///
/// `lines` are the non-empty lines of the dataset, header first. Line
/// numbers in the records are 1-based positions in `lines`.
pub fn validate_lines(mut lines: Vec<String>) -> (Vec<String>, Vec<ErrorRecord>) {
    let Some(header) = lines.first() else {
        return (lines, Vec::new());
    };
    let expected = column_count(header);

    let quarantine: Vec<ErrorRecord> = lines
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, line)| {
            let found = column_count(line);
            (found != expected).then(|| ErrorRecord::column_mismatch(idx + 1, line, found, expected))
        })
        .collect();

    for record in quarantine.iter().rev() {
        debug!(line = record.line_number, reason = %record.reason, "Removing malformed row");
        lines.remove(record.line_number - 1);
    }

    (lines, quarantine)
}

/// Validates a dataset and writes its quarantine file
#[derive(Debug, Clone)]
pub struct RecordValidator {
    quarantine_file: String,
}

impl RecordValidator {
    pub fn new(quarantine_file: impl Into<String>) -> Self {
        Self {
            quarantine_file: quarantine_file.into(),
        }
    }

    pub fn quarantine_path_for(&self, dataset: &Path) -> PathBuf {
        match dataset.parent() {
            Some(parent) => parent.join(&self.quarantine_file),
            None => PathBuf::from(&self.quarantine_file),
        }
    }

    /// Validate `dataset`, rewriting it when rows were quarantined.
    ///
    /// A quarantine file from an earlier run is removed when this run
    /// quarantines nothing.
    pub fn validate(&self, dataset: &Path) -> Result<ValidationReport> {
        let contents = std::fs::read_to_string(dataset)?;
        let lines: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if lines.len() < 2 {
            return Err(IngestError::InsufficientLines {
                path: dataset.to_path_buf(),
                lines: lines.len(),
            });
        }

        let expected_columns = column_count(&lines[0]);
        let (kept, quarantine) = validate_lines(lines);
        let quarantine_path = self.quarantine_path_for(dataset);

        if quarantine.is_empty() {
            if quarantine_path.exists() {
                std::fs::remove_file(&quarantine_path)?;
            }
            info!(path = %dataset.display(), rows = kept.len() - 1, "Dataset valid");

            return Ok(ValidationReport {
                dataset: dataset.to_path_buf(),
                expected_columns,
                rows_kept: kept.len() - 1,
                rows_quarantined: 0,
                quarantine_path: None,
            });
        }

        info!(
            count = quarantine.len(),
            path = %quarantine_path.display(),
            "Quarantining {} malformed row(s)",
            quarantine.len()
        );
        write_quarantine(&quarantine_path, &quarantine)?;
        rewrite_dataset(dataset, &kept)?;

        info!(path = %dataset.display(), lines = kept.len(), "Dataset rewritten");

        Ok(ValidationReport {
            dataset: dataset.to_path_buf(),
            expected_columns,
            rows_kept: kept.len() - 1,
            rows_quarantined: quarantine.len(),
            quarantine_path: Some(quarantine_path),
        })
    }
}

fn write_quarantine(path: &Path, records: &[ErrorRecord]) -> Result<()> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "{}", QUARANTINE_HEADER)?;
    for record in records {
        writeln!(writer, "{}", record.to_quarantine_line())?;
    }
    writer.flush()?;
    Ok(())
}

fn rewrite_dataset(dataset: &Path, lines: &[String]) -> Result<()> {
    let dir = match dataset.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let temp = tempfile::Builder::new()
        .prefix(".ruc-valid-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
    }
    temp.persist(dataset)?;
    Ok(())
}
