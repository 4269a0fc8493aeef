// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record store management and manipulation.
//!
//! Folio keeps every collected record in one place called the __record
//! store__. The record store is a keyed collection per record type that
//! reconciliation diffs freshly collected records against.
//!
//! # Record Store Layout
//!
//! The record store can generally be placed anywhere on the user's file
//! system. However, the default location is `$XDG_DATA_HOME/folio-store`.
//! Each record type is given its own TOML table file named after the type,
//! so `$XDG_DATA_HOME/folio-store/file_record.toml` holds every
//! [`FileRecord`](crate::record::file::FileRecord).
//!
//! # Commits
//!
//! Mutations only touch the in-memory table. Nothing reaches the file system
//! until [`RecordStore::commit`] is called, which replaces the table file in
//! one atomic rename. A store dropped before committing leaves the table
//! file exactly as it was, and [`RecordStore::rollback`] puts the in-memory
//! table back to the last commit.

use crate::record::{Record, RecordId};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{read_to_string, rename, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Keyed collection of records of one type.
pub trait RecordStore<R>
where
    R: Record,
{
    /// Number of records.
    fn count(&self) -> Result<usize>;

    /// Check if a record with identifier exists.
    fn exists(&self, id: RecordId) -> Result<bool>;

    /// Find record by identifier.
    fn find(&self, id: RecordId) -> Result<Option<R>>;

    /// Every record in the store.
    fn find_all(&self) -> Result<Vec<R>>;

    /// Insert new record.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Duplicate`] if identifier is already taken.
    fn insert(&mut self, record: R) -> Result<()>;

    /// Replace record with identifier.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Missing`] if identifier is unknown.
    fn update_by_id(&mut self, id: RecordId, record: R) -> Result<()>;

    /// Remove record with identifier, returning it.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Missing`] if identifier is unknown.
    fn delete_by_id(&mut self, id: RecordId) -> Result<R>;

    /// Make every mutation since the last commit durable as one unit.
    fn commit(&mut self) -> Result<()>;

    /// Discard every mutation since the last commit.
    fn rollback(&mut self) -> Result<()>;
}

/// Record table shared by store implementations.
#[derive(Clone, Debug, PartialEq)]
struct Table<R>
where
    R: Record,
{
    records: BTreeMap<RecordId, R>,
}

impl<R> Default for Table<R>
where
    R: Record,
{
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<R> Table<R>
where
    R: Record,
{
    fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: records.into_iter().map(|record| (record.id(), record)).collect(),
        }
    }

    fn insert(&mut self, record: R) -> Result<()> {
        let id = record.id();
        if self.records.contains_key(&id) {
            return Err(StoreError::Duplicate {
                type_name: R::TYPE_NAME,
                id,
            });
        }

        self.records.insert(id, record);
        Ok(())
    }

    fn update(&mut self, id: RecordId, record: R) -> Result<()> {
        match self.records.get_mut(&id) {
            Some(entry) => {
                *entry = record;
                Ok(())
            }
            None => Err(StoreError::Missing {
                type_name: R::TYPE_NAME,
                id,
            }),
        }
    }

    fn delete(&mut self, id: RecordId) -> Result<R> {
        self.records.remove(&id).ok_or(StoreError::Missing {
            type_name: R::TYPE_NAME,
            id,
        })
    }
}

/// On-disk layout of a table file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "R: Serialize", deserialize = "R: DeserializeOwned"))]
struct TableFile<R> {
    #[serde(default = "Vec::new")]
    record: Vec<R>,
}

/// Record store backed by one TOML file per record type.
#[derive(Debug)]
pub struct TomlStore<R>
where
    R: Record,
{
    table_path: PathBuf,
    table: Table<R>,
    committed: Table<R>,
}

impl<R> TomlStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    /// Open record store at directory.
    ///
    /// Creates the store directory if it does not exist yet, and loads the
    /// record type's table file if there is one.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateStore`] if store directory cannot be
    ///   created.
    /// - Return [`StoreError::ReadTable`] if table file cannot be read.
    /// - Return [`StoreError::Deserialize`] if table file is malformed.
    #[instrument(skip(path), level = "debug")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        mkdirp::mkdirp(path).map_err(|err| StoreError::CreateStore {
            source: err,
            path: path.into(),
        })?;

        let table_path = path.join(table_file_name(R::TYPE_NAME));
        let table = if table_path.exists() {
            let content = read_to_string(&table_path).map_err(|err| StoreError::ReadTable {
                source: err,
                table_path: table_path.clone(),
            })?;
            let file: TableFile<R> =
                toml::de::from_str(&content).map_err(|err| StoreError::Deserialize {
                    source: err,
                    table_path: table_path.clone(),
                })?;
            Table::from_records(file.record)
        } else {
            Table::default()
        };

        debug!("loaded {} {} records", table.records.len(), R::TYPE_NAME);
        Ok(Self {
            table_path,
            committed: table.clone(),
            table,
        })
    }

    /// Path to table file.
    pub fn table_path(&self) -> &Path {
        self.table_path.as_path()
    }
}

impl<R> RecordStore<R> for TomlStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    fn count(&self) -> Result<usize> {
        Ok(self.table.records.len())
    }

    fn exists(&self, id: RecordId) -> Result<bool> {
        Ok(self.table.records.contains_key(&id))
    }

    fn find(&self, id: RecordId) -> Result<Option<R>> {
        Ok(self.table.records.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<R>> {
        Ok(self.table.records.values().cloned().collect())
    }

    fn insert(&mut self, record: R) -> Result<()> {
        self.table.insert(record)
    }

    fn update_by_id(&mut self, id: RecordId, record: R) -> Result<()> {
        self.table.update(id, record)
    }

    fn delete_by_id(&mut self, id: RecordId) -> Result<R> {
        self.table.delete(id)
    }

    #[instrument(skip(self), level = "debug")]
    fn commit(&mut self) -> Result<()> {
        let file = TableFile {
            record: self.table.records.values().cloned().collect(),
        };
        let content = toml::ser::to_string_pretty(&file).map_err(StoreError::Serialize)?;

        // INVARIANT: Table file is replaced atomically, never written in place.
        let temp_path = self.table_path.with_extension("toml.tmp");
        write(&temp_path, content.as_bytes()).map_err(|err| StoreError::WriteTable {
            source: err,
            table_path: temp_path.clone(),
        })?;
        rename(&temp_path, &self.table_path).map_err(|err| StoreError::WriteTable {
            source: err,
            table_path: self.table_path.clone(),
        })?;

        self.committed = self.table.clone();
        info!(
            "committed {} {} records to {:?}",
            file.record.len(),
            R::TYPE_NAME,
            self.table_path.display()
        );
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        debug!("roll back {} table to last commit", R::TYPE_NAME);
        self.table = self.committed.clone();
        Ok(())
    }
}

/// Record store that lives in memory only.
///
/// Commits only mark a point to roll back to. Useful for dry runs.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryStore<R>
where
    R: Record,
{
    table: Table<R>,
    committed: Table<R>,
}

impl<R> MemoryStore<R>
where
    R: Record,
{
    /// Construct new empty memory store.
    pub fn new() -> Self {
        Self::with_records([])
    }

    /// Construct new memory store holding records.
    ///
    /// Later records replace earlier ones with the same identifier.
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let table = Table::from_records(records);
        Self {
            committed: table.clone(),
            table,
        }
    }
}

impl<R> Default for MemoryStore<R>
where
    R: Record,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RecordStore<R> for MemoryStore<R>
where
    R: Record,
{
    fn count(&self) -> Result<usize> {
        Ok(self.table.records.len())
    }

    fn exists(&self, id: RecordId) -> Result<bool> {
        Ok(self.table.records.contains_key(&id))
    }

    fn find(&self, id: RecordId) -> Result<Option<R>> {
        Ok(self.table.records.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<R>> {
        Ok(self.table.records.values().cloned().collect())
    }

    fn insert(&mut self, record: R) -> Result<()> {
        self.table.insert(record)
    }

    fn update_by_id(&mut self, id: RecordId, record: R) -> Result<()> {
        self.table.update(id, record)
    }

    fn delete_by_id(&mut self, id: RecordId) -> Result<R> {
        self.table.delete(id)
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = self.table.clone();
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.table = self.committed.clone();
        Ok(())
    }
}

/// Table file name for record type, e.g., "FileRecord" gives "file_record.toml".
fn table_file_name(type_name: &str) -> String {
    let mut name = String::with_capacity(type_name.len() + 8);
    for (index, c) in type_name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                name.push('_');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name.push_str(".toml");

    name
}

/// All possible error types for record store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Identifier is already taken.
    #[error("{type_name} record {id} already exists")]
    Duplicate { type_name: &'static str, id: RecordId },

    /// Identifier is unknown.
    #[error("{type_name} record {id} does not exist")]
    Missing { type_name: &'static str, id: RecordId },

    /// Store directory cannot be created.
    #[error("failed to create record store at {:?}", path.display())]
    CreateStore {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Table file cannot be read.
    #[error("failed to read record table {:?}", table_path.display())]
    ReadTable {
        #[source]
        source: std::io::Error,
        table_path: PathBuf,
    },

    /// Table file cannot be written.
    #[error("failed to write record table {:?}", table_path.display())]
    WriteTable {
        #[source]
        source: std::io::Error,
        table_path: PathBuf,
    },

    /// Table file is malformed.
    #[error("failed to parse record table {:?}", table_path.display())]
    Deserialize {
        #[source]
        source: toml::de::Error,
        table_path: PathBuf,
    },

    /// Table cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::DocumentKind, record::file::FileRecord};
    use chrono::{TimeZone, Utc};
    use simple_test_case::test_case;

    fn record(path: &str, hour: u32) -> FileRecord {
        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
        FileRecord::with_times(path, DocumentKind::Note, path, vec!["tag".into()], stamp, stamp)
            .unwrap()
    }

    #[test_case("FileRecord", "file_record.toml"; "camel case")]
    #[test_case("Record", "record.toml"; "single word")]
    #[test]
    fn table_file_name_is_snake_case(type_name: &str, expect: &str) {
        assert_eq!(table_file_name(type_name), expect);
    }

    #[test]
    fn memory_store_crud() -> anyhow::Result<()> {
        let mut store = MemoryStore::new();
        let a = record("/notes/a.md", 1);
        store.insert(a.clone())?;
        assert_eq!(store.count()?, 1);
        assert!(store.exists(a.id())?);

        let touched = record("/notes/a.md", 2);
        store.update_by_id(a.id(), touched.clone())?;
        assert_eq!(store.find(a.id())?, Some(touched.clone()));

        assert_eq!(store.delete_by_id(a.id())?, touched);
        assert_eq!(store.count()?, 0);
        assert_eq!(store.find(a.id())?, None);
        Ok(())
    }

    #[test]
    fn insert_rejects_duplicate_id() -> anyhow::Result<()> {
        let mut store = MemoryStore::new();
        store.insert(record("/notes/a.md", 1))?;
        let result = store.insert(record("/notes/a.md", 2));
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
        Ok(())
    }

    #[test]
    fn update_and_delete_reject_missing_id() {
        let mut store = MemoryStore::new();
        let a = record("/notes/a.md", 1);
        assert!(matches!(
            store.update_by_id(a.id(), a.clone()),
            Err(StoreError::Missing { .. })
        ));
        assert!(matches!(store.delete_by_id(a.id()), Err(StoreError::Missing { .. })));
    }

    #[test]
    fn toml_store_persists_on_commit() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store");
        let a = record("/notes/a.md", 1);
        let b = record("/notes/b.md", 2);

        let mut store = TomlStore::<FileRecord>::open(&path)?;
        store.insert(a.clone())?;
        store.insert(b.clone())?;
        store.commit()?;
        assert!(path.join("file_record.toml").exists());
        assert!(!path.join("file_record.toml.tmp").exists());

        let store = TomlStore::<FileRecord>::open(&path)?;
        let mut records = store.find_all()?;
        records.sort_by_key(|record| record.path().to_path_buf());
        assert_eq!(records, vec![a.clone(), b]);
        assert_eq!(
            store.find(a.id())?.map(|record| record.tags().to_vec()),
            Some(vec!["tag".into()])
        );
        Ok(())
    }

    #[test]
    fn toml_store_discards_uncommitted_mutations() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = record("/notes/a.md", 1);

        let mut store = TomlStore::<FileRecord>::open(dir.path())?;
        store.insert(a.clone())?;
        store.commit()?;

        let mut store = TomlStore::<FileRecord>::open(dir.path())?;
        store.delete_by_id(a.id())?;
        store.insert(record("/notes/b.md", 1))?;
        drop(store);

        let store = TomlStore::<FileRecord>::open(dir.path())?;
        assert_eq!(store.find_all()?, vec![a]);
        Ok(())
    }

    #[test]
    fn toml_store_rolls_back_to_last_commit() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = record("/notes/a.md", 1);

        let mut store = TomlStore::<FileRecord>::open(dir.path())?;
        store.insert(a.clone())?;
        store.commit()?;
        store.delete_by_id(a.id())?;
        store.insert(record("/notes/b.md", 1))?;
        store.rollback()?;
        assert_eq!(store.find_all()?, vec![a.clone()]);

        store.commit()?;
        let store = TomlStore::<FileRecord>::open(dir.path())?;
        assert_eq!(store.find_all()?, vec![a]);
        Ok(())
    }

    #[test]
    fn toml_store_rejects_malformed_table() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("file_record.toml"), "record = 42")?;
        let result = TomlStore::<FileRecord>::open(dir.path());
        assert!(matches!(result, Err(StoreError::Deserialize { .. })));
        Ok(())
    }
}
