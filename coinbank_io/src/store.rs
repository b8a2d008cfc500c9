//! Append-only reading logs.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use coinbank_traits::{ReadingStore, WeightSample};
use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

/// One row of the CSV reading log: `timestamp,weight_g`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub timestamp: String,
    pub weight_g: f64,
}

impl ReadingRow {
    pub fn now(weight_g: f64) -> Self {
        Self {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            weight_g,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct CsvReadingStore {
    path: PathBuf,
    writer: csv::Writer<std::fs::File>,
}

impl CsvReadingStore {
    /// Open `path` for appending; the header is written only to a new or empty file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;
        let has_rows = std::fs::metadata(&path).is_ok_and(|m| m.len() > 0);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!has_rows)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Weight of the last well-formed row in the log at `path`, if any.
    ///
    /// A missing file is not an error. Malformed rows are skipped.
    pub fn last_weight(path: impl AsRef<Path>) -> Result<Option<f64>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let mut last = None;
        for (idx, rec) in rdr.deserialize::<ReadingRow>().enumerate() {
            match rec {
                Ok(row) if row.weight_g.is_finite() && row.weight_g >= 0.0 => {
                    last = Some(row.weight_g);
                }
                Ok(row) => {
                    tracing::debug!(row = idx + 2, weight_g = row.weight_g, "skipping bad weight");
                }
                Err(e) => tracing::debug!(row = idx + 2, error = %e, "skipping malformed row"),
            }
        }
        Ok(last)
    }
}

impl ReadingStore for CsvReadingStore {
    fn append(
        &mut self,
        sample: &WeightSample,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.writer
            .serialize(ReadingRow::now(sample.value_g))
            .map_err(IoError::from)?;
        self.writer.flush().map_err(IoError::from)?;
        Ok(())
    }
}

/// Discards every sample (`store.kind = "none"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ReadingStore for NullStore {
    fn append(
        &mut self,
        _sample: &WeightSample,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReadingStore;

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::path::Path;

    use coinbank_traits::{ReadingStore, WeightSample};
    use rusqlite::{Connection, OptionalExtension, params};

    use super::{ReadingRow, ensure_parent};
    use crate::error::{IoError, Result};

    const SCHEMA: &str = r"
        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            weight REAL NOT NULL
        );
    ";

    #[derive(Debug)]
    pub struct SqliteReadingStore {
        conn: Connection,
    }

    impl SqliteReadingStore {
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            ensure_parent(path)?;
            Self::init(Connection::open(path)?)
        }

        pub fn open_in_memory() -> Result<Self> {
            Self::init(Connection::open_in_memory()?)
        }

        fn init(conn: Connection) -> Result<Self> {
            conn.execute_batch(SCHEMA)?;
            Ok(Self { conn })
        }

        pub fn last_weight(&self) -> Result<Option<f64>> {
            Ok(self
                .conn
                .query_row(
                    "SELECT weight FROM readings ORDER BY id DESC LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .optional()?)
        }

        pub fn count(&self) -> Result<u64> {
            let n: i64 = self
                .conn
                .query_row("SELECT COUNT(*) FROM readings", [], |r| r.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        }
    }

    impl ReadingStore for SqliteReadingStore {
        fn append(
            &mut self,
            sample: &WeightSample,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let row = ReadingRow::now(sample.value_g);
            self.conn
                .execute(
                    "INSERT INTO readings (timestamp, weight) VALUES (?1, ?2)",
                    params![row.timestamp, row.weight_g],
                )
                .map_err(IoError::from)?;
            Ok(())
        }
    }
}
