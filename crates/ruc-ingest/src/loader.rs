//! Store rebuild from the validated dataset
//!
//! The store is always rebuilt from scratch. Dataset columns map onto store
//! columns by position through [`StoreField`]; the dataset header is never
//! consulted.

use ruc_common::types::{FlatRecord, StoreField, StoreRow};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tracing::{debug, error, info, warn};

use crate::error::{IngestError, Result};

pub const STORE_TABLE: &str = "ruc";

const CREATE_TABLE: &str = r#"
    CREATE TABLE ruc (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ruc TEXT,
        razon_social TEXT,
        dv TEXT,
        ruc_anterior TEXT,
        estado TEXT
    )
"#;

const CREATE_INDEX: &str = "CREATE INDEX idx_ruc_ruc ON ruc (ruc)";

/// Rows per INSERT statement, keeping bound parameters under SQLite's
/// historical limit of 999.
const ROWS_PER_STATEMENT: usize = 150;

/// The store file and the SQLite side files that belong to it.
pub fn store_files(store: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = store.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };
    [store.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}

async fn remove_store_files(store: &Path) -> std::io::Result<()> {
    for path in store_files(store) {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed store file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Batch loader for the `ruc` table
#[derive(Debug, Clone, Copy)]
pub struct StoreLoader {
    batch_size: usize,
    commit_every_batches: usize,
}

impl StoreLoader {
    pub fn new(batch_size: usize, commit_every_batches: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            commit_every_batches: commit_every_batches.max(1),
        }
    }

    /// Rebuild `store` from `dataset`, returning the number of rows inserted.
    ///
    /// On failure the partially built store is deleted and
    /// [`IngestError::LoadFailed`] is returned.
    #[tracing::instrument(skip(self), fields(batch_size = self.batch_size))]
    pub async fn load(&self, dataset: &Path, store: &Path) -> Result<u64> {
        remove_store_files(store).await?;
        if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(store)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| IngestError::LoadFailed {
                path: store.to_path_buf(),
                source: Box::new(e.into()),
            })?;

        let result = self.insert_all(&pool, dataset).await;
        pool.close().await;

        match result {
            Ok(rows) => {
                info!(store = %store.display(), rows, "Store built");
                Ok(rows)
            },
            Err(e) => {
                error!(store = %store.display(), error = %e, "Store load failed, removing partial store");
                if let Err(cleanup) = remove_store_files(store).await {
                    warn!(store = %store.display(), error = %cleanup, "Failed to remove partial store");
                }
                Err(IngestError::LoadFailed {
                    path: store.to_path_buf(),
                    source: Box::new(e),
                })
            },
        }
    }

    async fn insert_all(&self, pool: &SqlitePool, dataset: &Path) -> Result<u64> {
        sqlx::query(CREATE_TABLE).execute(pool).await?;

        let file = tokio::fs::File::open(dataset).await?;
        let mut lines = tokio::io::BufReader::new(file).lines();

        // header
        lines.next_line().await?;

        let mut inserted = 0u64;
        let mut pending_batches = 0usize;
        let mut batch: Vec<StoreRow> = Vec::with_capacity(self.batch_size);

        // an uncommitted transaction is rolled back when dropped on error
        let mut tx = pool.begin().await?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            batch.push(StoreRow::from_record(&FlatRecord::parse(line)));
            if batch.len() < self.batch_size {
                continue;
            }

            insert_batch(&mut tx, &batch).await?;
            inserted += batch.len() as u64;
            batch.clear();
            pending_batches += 1;

            if pending_batches >= self.commit_every_batches {
                tx.commit().await?;
                debug!(rows = inserted, "Committed");
                tx = pool.begin().await?;
                pending_batches = 0;
            }
        }

        if !batch.is_empty() {
            insert_batch(&mut tx, &batch).await?;
            inserted += batch.len() as u64;
        }
        tx.commit().await?;

        sqlx::query(CREATE_INDEX).execute(pool).await?;

        Ok(inserted)
    }
}

async fn insert_batch(tx: &mut Transaction<'_, Sqlite>, rows: &[StoreRow]) -> Result<()> {
    let columns: Vec<&str> = StoreField::ALL.iter().map(|f| f.column()).collect();

    for chunk in rows.chunks(ROWS_PER_STATEMENT) {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            STORE_TABLE,
            columns.join(", ")
        ));

        query_builder.push_values(chunk, |mut b, row| {
            for field in StoreField::ALL {
                b.push_bind(row.get(field));
            }
        });

        query_builder.build().execute(&mut **tx).await?;
    }

    Ok(())
}
