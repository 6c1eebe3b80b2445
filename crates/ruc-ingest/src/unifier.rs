//! Merge extracted flat files into one dataset
//!
//! Every `*.txt` under the extraction root is streamed line by line into a
//! temporary file next to the dataset. The temporary file only replaces the
//! dataset once at least one row made it in, so a failed merge never leaves a
//! half-written dataset behind.

use ruc_common::types::{FlatRecord, StoreField, FIELD_DELIMITER};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::HeaderPolicy;
use crate::error::{IngestError, Result};

/// Result of a successful merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifyOutcome {
    pub path: PathBuf,
    pub header: Vec<String>,
    pub rows: usize,
    pub files_scanned: usize,
    /// Files that could not be read in full
    pub files_skipped: usize,
}

/// All `*.txt` files under `root`, sorted by path.
pub fn find_flat_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "txt"))
        .map(|entry| entry.into_path())
        .collect()
}

/// First non-empty first line among `files`, split into trimmed fields.
///
/// Returns the header and the index of the file it came from.
fn resolve_header(files: &[PathBuf]) -> Option<(Vec<String>, usize)> {
    for (idx, path) in files.iter().enumerate() {
        let mut first = String::new();
        let read = File::open(path).and_then(|f| BufReader::new(f).read_line(&mut first));

        match read {
            Ok(_) => {
                let record = FlatRecord::parse(&first);
                if !first.trim().is_empty() {
                    return Some((record.fields().to_vec(), idx));
                }
            },
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read header line");
            },
        }
    }

    None
}

/// Streams flat files into the unified dataset
#[derive(Debug, Clone, Copy)]
pub struct RecordUnifier {
    batch_size: usize,
    header_policy: HeaderPolicy,
}

impl RecordUnifier {
    pub fn new(batch_size: usize, header_policy: HeaderPolicy) -> Self {
        Self {
            batch_size: batch_size.max(1),
            header_policy,
        }
    }

    /// Merge every flat file under `root` into `output`.
    ///
    /// Fails with [`IngestError::NoRowsMerged`] when no data rows were found;
    /// an existing dataset at `output` is left untouched in that case.
    pub fn unify(&self, root: &Path, output: &Path) -> Result<UnifyOutcome> {
        let files = find_flat_files(root);
        info!(root = %root.display(), files = files.len(), "Merging flat files");

        let (header, header_source) = match resolve_header(&files) {
            Some((header, idx)) => (header, Some(idx)),
            None => {
                info!("No header line found, using default header");
                (StoreField::fallback_header(), None)
            },
        };

        let out_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&out_dir)?;

        let temp = tempfile::Builder::new()
            .prefix(".ruc-merge-")
            .suffix(".tmp")
            .tempfile_in(&out_dir)?;

        let mut rows = 0usize;
        let mut files_skipped = 0usize;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writeln!(writer, "{}", header.join(&FIELD_DELIMITER.to_string()))?;

            for (idx, path) in files.iter().enumerate() {
                let skip = self.first_line_rule(idx, header_source);
                let before = rows;

                match self.merge_file(path, &header, skip, &mut writer, &mut rows) {
                    Ok(()) => {
                        debug!(file = %path.display(), rows = rows - before, "Merged file");
                    },
                    Err(e) => {
                        files_skipped += 1;
                        warn!(
                            file = %path.display(),
                            error = %e,
                            rows_kept = rows - before,
                            "Failed while reading flat file, skipping the rest of it"
                        );
                    },
                }
            }

            writer.flush()?;
        }

        if rows == 0 {
            temp.close()?;
            warn!(root = %root.display(), "No data rows found in flat files");
            return Err(IngestError::NoRowsMerged {
                root: root.to_path_buf(),
                files_scanned: files.len(),
            });
        }

        if output.exists() {
            debug!(path = %output.display(), "Replacing existing dataset");
            std::fs::remove_file(output)?;
        }
        temp.persist(output)?;

        info!(path = %output.display(), rows, files = files.len(), files_skipped, "Dataset written");

        Ok(UnifyOutcome {
            path: output.to_path_buf(),
            header,
            rows,
            files_scanned: files.len(),
            files_skipped,
        })
    }

    fn first_line_rule(&self, file_idx: usize, header_source: Option<usize>) -> FirstLine {
        match self.header_policy {
            HeaderPolicy::SkipFirstLine => FirstLine::Skip,
            HeaderPolicy::SkipMatchingHeader => FirstLine::SkipIfHeader,
            HeaderPolicy::FirstFileOnly if header_source == Some(file_idx) => FirstLine::Skip,
            HeaderPolicy::FirstFileOnly => FirstLine::Keep,
        }
    }

    /// Append one file's rows. `rows` counts rows already flushed, so a
    /// failure part-way keeps every earlier batch and drops the pending one.
    fn merge_file<W: Write>(
        &self,
        path: &Path,
        header: &[String],
        first_line: FirstLine,
        writer: &mut W,
        rows: &mut usize,
    ) -> std::io::Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let mut batch: Vec<FlatRecord> = Vec::with_capacity(self.batch_size);

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record = FlatRecord::parse(trimmed);
            if line_idx == 0 {
                match first_line {
                    FirstLine::Skip => continue,
                    FirstLine::SkipIfHeader if record.fields() == header => continue,
                    _ => {},
                }
            }

            batch.push(record);
            if batch.len() >= self.batch_size {
                write_batch(writer, &batch)?;
                *rows += batch.len();
                batch.clear();
                debug!(rows = *rows, "Flushed batch");
            }
        }

        if !batch.is_empty() {
            write_batch(writer, &batch)?;
            *rows += batch.len();
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstLine {
    Skip,
    SkipIfHeader,
    Keep,
}

fn write_batch<W: Write>(writer: &mut W, batch: &[FlatRecord]) -> std::io::Result<()> {
    for record in batch {
        writeln!(writer, "{}", record.to_line())?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &[u8]) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn dataset_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_find_flat_files_recurses_and_filters() {
        let root = TempDir::new().unwrap();
        write(root.path(), "b/ruc1.txt", b"x");
        write(root.path(), "a/ruc0.txt", b"x");
        write(root.path(), "a/notes.md", b"x");

        let files = find_flat_files(root.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a/ruc0.txt"));
        assert!(files[1].ends_with("b/ruc1.txt"));
    }

    #[test]
    fn test_unify_two_files_single_header() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "ruc0/ruc0.txt", b"ruc|razon_social|dv|ruc_anterior|estado\n1|A|1|0|ACTIVO\n");
        write(root.path(), "ruc1/ruc1.txt", b"ruc|razon_social|dv|ruc_anterior|estado\n2|B|2|0|ACTIVO\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1000, HeaderPolicy::SkipFirstLine)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.files_scanned, 2);
        assert_eq!(
            dataset_lines(&output),
            vec![
                "ruc|razon_social|dv|ruc_anterior|estado",
                "1|A|1|0|ACTIVO",
                "2|B|2|0|ACTIVO",
            ]
        );
    }

    #[test]
    fn test_unify_trims_fields_and_skips_blank_lines() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "x.txt", b"h1 | h2\n\n  10 |  Uno  \n   \n20|Dos\r\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1, HeaderPolicy::SkipFirstLine)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.header, vec!["h1", "h2"]);
        assert_eq!(dataset_lines(&output), vec!["h1|h2", "10|Uno", "20|Dos"]);
    }

    #[test]
    fn test_unify_no_rows_keeps_existing_dataset() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "only_header.txt", b"ruc|razon_social\n");

        let output = data.path().join("ruc.csv");
        std::fs::write(&output, "previous run\n").unwrap();

        let result = RecordUnifier::new(1000, HeaderPolicy::SkipFirstLine).unify(root.path(), &output);

        assert!(matches!(result, Err(IngestError::NoRowsMerged { files_scanned: 1, .. })));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous run\n");
        // temporary file removed
        assert_eq!(std::fs::read_dir(data.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unify_empty_root_fails_with_no_rows() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let output = data.path().join("ruc.csv");

        let result = RecordUnifier::new(1000, HeaderPolicy::SkipFirstLine).unify(root.path(), &output);
        assert!(matches!(result, Err(IngestError::NoRowsMerged { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_unify_skips_undecodable_file() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "a.txt", b"ruc|nombre\n1|A\n");
        write(root.path(), "b.txt", b"ruc|nombre\n\xff\xfe\xfd|broken\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1000, HeaderPolicy::SkipFirstLine)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.rows, 1);
        assert_eq!(outcome.files_skipped, 1);
        assert_eq!(dataset_lines(&output), vec!["ruc|nombre", "1|A"]);
    }

    #[test]
    fn test_skip_matching_header_keeps_headerless_file_rows() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "a.txt", b"ruc|nombre\n1|A\n");
        write(root.path(), "b.txt", b"2|B\n3|C\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1000, HeaderPolicy::SkipMatchingHeader)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.rows, 3);
        assert_eq!(dataset_lines(&output), vec!["ruc|nombre", "1|A", "2|B", "3|C"]);
    }

    #[test]
    fn test_first_file_only_merges_later_first_lines() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "a.txt", b"ruc|nombre\n1|A\n");
        write(root.path(), "b.txt", b"ruc|nombre\n2|B\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1000, HeaderPolicy::FirstFileOnly)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.rows, 3);
        assert_eq!(
            dataset_lines(&output),
            vec!["ruc|nombre", "1|A", "ruc|nombre", "2|B"]
        );
    }

    #[test]
    fn test_fallback_header_when_first_lines_empty() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write(root.path(), "a.txt", b"\n1|A|1|0|ACTIVO\n");

        let output = data.path().join("ruc.csv");
        let outcome = RecordUnifier::new(1000, HeaderPolicy::SkipFirstLine)
            .unify(root.path(), &output)
            .unwrap();

        assert_eq!(outcome.header, StoreField::fallback_header());
        assert_eq!(outcome.rows, 1);
    }
}
