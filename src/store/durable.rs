//! On-disk triple store backed by redb.
//!
//! Triples are grouped into three tables so every [`TripleSource`] query is a
//! single key lookup:
//!
//! - `subjects`: subject → all of its triples
//! - `objects`: term object → `(predicate, subject)` pairs
//! - `values`: literal value → `(predicate, subject)` pairs
//!
//! Rows are bincode-encoded. Writes happen only in [`DurableStore::import`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::store::{StoreResult, TripleSource};
use crate::term::{Object, TermId, Triple};

const SUBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("subjects");
const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");
const VALUES: TableDefinition<&str, &[u8]> = TableDefinition::new("values");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const TRIPLE_COUNT_KEY: &str = "triples";

type Pairs = Vec<(TermId, TermId)>;

fn redb_err(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Redb {
        message: format!("{context}: {e}"),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode row: {e}"),
    })
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode row: {e}"),
    })
}

/// redb-backed statements store.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a store at `path`, creating the tables if needed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;

        let txn = db.begin_write().map_err(|e| redb_err("begin_write failed", e))?;
        {
            txn.open_table(SUBJECTS)
                .map_err(|e| redb_err("open_table failed", e))?;
            txn.open_table(OBJECTS)
                .map_err(|e| redb_err("open_table failed", e))?;
            txn.open_table(VALUES)
                .map_err(|e| redb_err("open_table failed", e))?;
            txn.open_table(META)
                .map_err(|e| redb_err("open_table failed", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit failed", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open a store that must already exist.
    pub fn open_existing(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::Unavailable {
                message: format!("no database at {}", path.display()),
            });
        }
        Self::open(path)
    }

    /// Bulk-load triples in one write transaction, merging with existing rows.
    ///
    /// Returns the number of triples that were not already present.
    pub fn import<I: IntoIterator<Item = Triple>>(&self, triples: I) -> StoreResult<usize> {
        let mut subjects: BTreeMap<TermId, Vec<Triple>> = BTreeMap::new();
        let mut objects: BTreeMap<TermId, Pairs> = BTreeMap::new();
        let mut values: BTreeMap<String, Pairs> = BTreeMap::new();
        for triple in triples {
            match &triple.object {
                Object::Term(o) => objects
                    .entry(o.clone())
                    .or_default()
                    .push((triple.predicate.clone(), triple.subject.clone())),
                Object::Literal(l) => values
                    .entry(l.value.clone())
                    .or_default()
                    .push((triple.predicate.clone(), triple.subject.clone())),
            }
            subjects.entry(triple.subject.clone()).or_default().push(triple);
        }

        let txn = self
            .db
            .begin_write()
            .map_err(|e| redb_err("begin_write failed", e))?;
        let mut added = 0;
        {
            let mut table = txn
                .open_table(SUBJECTS)
                .map_err(|e| redb_err("open_table failed", e))?;
            for (subject, rows) in subjects {
                let mut existing: Vec<Triple> = match table
                    .get(subject.as_str())
                    .map_err(|e| redb_err("get failed", e))?
                {
                    Some(guard) => decode(guard.value())?,
                    None => Vec::new(),
                };
                for row in rows {
                    if !existing.contains(&row) {
                        existing.push(row);
                        added += 1;
                    }
                }
                let bytes = encode(&existing)?;
                table
                    .insert(subject.as_str(), bytes.as_slice())
                    .map_err(|e| redb_err("insert failed", e))?;
            }
        }
        {
            let mut table = txn
                .open_table(OBJECTS)
                .map_err(|e| redb_err("open_table failed", e))?;
            for (object, pairs) in objects {
                let bytes = merge_pairs(&table, object.as_str(), pairs)?;
                table
                    .insert(object.as_str(), bytes.as_slice())
                    .map_err(|e| redb_err("insert failed", e))?;
            }
        }
        {
            let mut table = txn
                .open_table(VALUES)
                .map_err(|e| redb_err("open_table failed", e))?;
            for (value, pairs) in values {
                let bytes = merge_pairs(&table, value.as_str(), pairs)?;
                table
                    .insert(value.as_str(), bytes.as_slice())
                    .map_err(|e| redb_err("insert failed", e))?;
            }
        }
        {
            let mut table = txn
                .open_table(META)
                .map_err(|e| redb_err("open_table failed", e))?;
            let count = table
                .get(TRIPLE_COUNT_KEY)
                .map_err(|e| redb_err("get failed", e))?
                .map(|g| g.value())
                .unwrap_or(0);
            table
                .insert(TRIPLE_COUNT_KEY, count + added as u64)
                .map_err(|e| redb_err("insert failed", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit failed", e))?;

        tracing::info!(added, "imported triples into durable store");
        Ok(added)
    }

    /// Number of distinct triples stored.
    pub fn triple_count(&self) -> StoreResult<u64> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| redb_err("begin_read failed", e))?;
        let table = txn
            .open_table(META)
            .map_err(|e| redb_err("open_table failed", e))?;
        Ok(table
            .get(TRIPLE_COUNT_KEY)
            .map_err(|e| redb_err("get failed", e))?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    fn read_row<T: serde::de::DeserializeOwned + Default>(
        &self,
        def: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
    ) -> StoreResult<T> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| redb_err("begin_read failed", e))?;
        let table = txn
            .open_table(def)
            .map_err(|e| redb_err("open_table failed", e))?;
        match table.get(key).map_err(|e| redb_err("get failed", e))? {
            Some(guard) => decode(guard.value()),
            None => Ok(T::default()),
        }
    }
}

fn merge_pairs(
    table: &redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    pairs: Pairs,
) -> StoreResult<Vec<u8>> {
    let mut existing: Pairs = match table.get(key).map_err(|e| redb_err("get failed", e))? {
        Some(guard) => decode(guard.value())?,
        None => Vec::new(),
    };
    for pair in pairs {
        if !existing.contains(&pair) {
            existing.push(pair);
        }
    }
    encode(&existing)
}

impl TripleSource for DurableStore {
    fn triples_with_subject(&self, subject: &TermId) -> StoreResult<Vec<Triple>> {
        self.read_row(SUBJECTS, subject.as_str())
    }

    fn subjects_with_object(
        &self,
        predicate: &TermId,
        object: &TermId,
    ) -> StoreResult<Vec<TermId>> {
        let pairs: Pairs = self.read_row(OBJECTS, object.as_str())?;
        Ok(pairs
            .into_iter()
            .filter(|(p, _)| p == predicate)
            .map(|(_, s)| s)
            .collect())
    }

    fn subjects_with_value(&self, predicate: &TermId, value: &str) -> StoreResult<Vec<TermId>> {
        let pairs: Pairs = self.read_row(VALUES, value)?;
        Ok(pairs
            .into_iter()
            .filter(|(p, _)| p == predicate)
            .map(|(_, s)| s)
            .collect())
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}
