//! Long-lived, memoized access to the dataset tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use arrow::array::RecordBatch;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::reader::{empty_table, read_table, TableSource};
use crate::resolver::{EntityKind, EntityResolver};
use crate::schema::Table;

/// Collected user-visible warnings for one request.
pub type Warnings = Vec<String>;

/// Read-only view over the dataset directory.
///
/// Each table is read at most once; later calls return the cached batch.
/// Failed loads are not cached, so a table that appears later is picked up
/// on the next call.
#[derive(Debug)]
pub struct Dataset {
    /// `None` for a purely in-memory dataset.
    root: Option<PathBuf>,
    tables: RwLock<HashMap<Table, RecordBatch>>,
}

impl Dataset {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// A dataset whose tables are already in memory. Tables not given are
    /// unavailable; nothing is read from disk.
    pub fn from_batches(batches: impl IntoIterator<Item = (Table, RecordBatch)>) -> Self {
        Self {
            root: None,
            tables: RwLock::new(batches.into_iter().collect()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn is_cached(&self, table: Table) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&table)
    }

    /// Load a table, reading it from disk on first use.
    pub fn load(&self, table: Table) -> Result<RecordBatch> {
        if let Some(batch) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
        {
            debug!(table = table.name(), "table cache hit");
            return Ok(batch.clone());
        }

        let Some(root) = &self.root else {
            return Err(Error::DataUnavailable {
                table: table.name(),
                reason: "not part of the in-memory dataset".to_string(),
            });
        };
        let source = TableSource::locate(root, table).ok_or_else(|| Error::DataUnavailable {
            table: table.name(),
            reason: format!(
                "no {}.csv or .parquet under {}",
                table.file_stem(),
                root.display()
            ),
        })?;
        let batch = read_table(table, &source).map_err(|e| match e {
            Error::DataUnavailable { .. } => e,
            other => Error::DataUnavailable {
                table: table.name(),
                reason: other.to_string(),
            },
        })?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have populated the entry meanwhile; keep the first.
        let cached = tables.entry(table).or_insert(batch);
        Ok(cached.clone())
    }

    /// Load a table, degrading to an empty batch with the declared schema and
    /// recording a warning when it is unavailable.
    pub fn load_or_warn(&self, table: Table, warnings: &mut Warnings) -> RecordBatch {
        match self.load(table) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(table = table.name(), error = %e, "table unavailable, using empty result");
                warnings.push(e.to_string());
                empty_table(table)
            }
        }
    }

    /// Build a name/id resolver over the reference table of `kind`.
    pub fn resolver(&self, kind: EntityKind, warnings: &mut Warnings) -> Result<EntityResolver> {
        let batch = self.load_or_warn(kind.table(), warnings);
        EntityResolver::from_batch(kind, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("f1db-races.csv"),
            "raceId,year,grandPrixId\n1,1950,great-britain\n2,1950,monaco\n",
        )
        .unwrap();

        let dataset = Dataset::open(dir.path());
        assert!(!dataset.is_cached(Table::Races));
        let first = dataset.load(Table::Races).unwrap();
        assert!(dataset.is_cached(Table::Races));

        // Removing the file proves the second call does not re-read it.
        fs::remove_file(dir.path().join("f1db-races.csv")).unwrap();
        let second = dataset.load(Table::Races).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.num_rows(), 2);
    }

    #[test]
    fn test_missing_table_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path());
        match dataset.load(Table::PitStops) {
            Err(Error::DataUnavailable { table, .. }) => assert_eq!(table, "races-pit-stops"),
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
        assert!(!dataset.is_cached(Table::PitStops));
    }

    #[test]
    fn test_load_or_warn_degrades_to_empty() {
        let dataset = Dataset::open("/nonexistent/f1-stats");
        let mut warnings = Warnings::new();
        let batch = dataset.load_or_warn(Table::Drivers, &mut warnings);
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), Table::Drivers.schema());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("drivers"));
    }

    #[test]
    fn test_from_batches_serves_preloaded_tables() {
        let batch = empty_table(Table::Countries);
        let dataset = Dataset::from_batches([(Table::Countries, batch.clone())]);
        assert_eq!(dataset.load(Table::Countries).unwrap(), batch);
        assert_eq!(dataset.root(), None);
        match dataset.load(Table::Drivers) {
            Err(Error::DataUnavailable { table, reason }) => {
                assert_eq!(table, "drivers");
                assert!(reason.contains("in-memory"));
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
        assert!(!dataset.is_cached(Table::Drivers));
    }
}
