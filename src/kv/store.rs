//! Ordered byte store and destination backed by fjall.

use std::collections::HashMap;
use std::path::Path;

use fjall::{Keyspace, KeyspaceCreateOptions, PersistMode};

use crate::logging::{debug, trace};
use crate::migrate::{Destination, KeyType, KeyValueDb, MigrateError, RawRow, RawRowIterator};

use super::format::RowCodec;

/// A fjall keyspace exposed as a generic ordered key-value database.
pub struct FjallStore {
    db: fjall::Database,
    keyspace: Keyspace,
}

impl FjallStore {
    /// Open an existing database directory and one of its keyspaces.
    pub fn open(path: &Path, keyspace: &str) -> Result<Self, MigrateError> {
        if !path.exists() {
            return Err(MigrateError::store_read(format!(
                "database not found at {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), keyspace = keyspace, "opening ordered store");

        let db = fjall::Database::builder(path)
            .open()
            .map_err(MigrateError::store_read)?;
        let keyspace = db
            .keyspace(keyspace, KeyspaceCreateOptions::default)
            .map_err(MigrateError::store_read)?;
        Ok(Self { db, keyspace })
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}

impl KeyValueDb for FjallStore {
    fn rows(&self) -> Box<dyn RawRowIterator + '_> {
        let iter = self.keyspace.iter().map(|guard| -> Result<RawRow, MigrateError> {
            let (key, value) = guard.into_inner().map_err(MigrateError::store_read)?;
            let key = std::str::from_utf8(&key).map_err(|_| {
                MigrateError::parse(
                    String::from_utf8_lossy(&key),
                    "row key is not valid UTF-8",
                )
            })?;
            Ok(RawRow::new(key, value.to_vec()))
        });
        Box::new(FjallRows {
            iter: Box::new(iter),
        })
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        debug!("closing ordered store");
        self.db
            .persist(PersistMode::SyncAll)
            .map_err(MigrateError::store_read)
    }
}

struct FjallRows<'a> {
    iter: Box<dyn Iterator<Item = Result<RawRow, MigrateError>> + 'a>,
}

impl RawRowIterator for FjallRows<'_> {
    fn next_row(&mut self) -> Result<Option<RawRow>, MigrateError> {
        self.iter.next().transpose()
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        // Drop the snapshot early; any later call sees an exhausted stream.
        self.iter = Box::new(std::iter::empty());
        Ok(())
    }
}

/// Head and tail positions of a stored list, inclusive.
#[derive(Debug, Clone, Copy)]
struct ListBounds {
    head: i64,
    tail: i64,
}

/// Writes typed records into a fjall keyspace using the [`RowCodec`] layout.
///
/// Data is persisted on [`Destination::close`].
pub struct FjallDestination {
    db: fjall::Database,
    keyspace: Keyspace,
    lists: HashMap<String, Option<ListBounds>>,
}

impl FjallDestination {
    /// Open or create a database directory and keyspace for writing.
    pub fn open(path: &Path, keyspace: &str) -> Result<Self, MigrateError> {
        debug!(path = %path.display(), keyspace = keyspace, "opening ordered destination");
        let db = fjall::Database::builder(path)
            .open()
            .map_err(MigrateError::store_write)?;
        let keyspace = db
            .keyspace(keyspace, KeyspaceCreateOptions::default)
            .map_err(MigrateError::store_write)?;
        Ok(Self {
            db,
            keyspace,
            lists: HashMap::new(),
        })
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    fn insert(&self, row_key: &str, value: &[u8]) -> Result<(), MigrateError> {
        trace!(row = ?row_key, len = value.len(), "writing row");
        self.keyspace
            .insert(row_key, value)
            .map_err(MigrateError::store_write)
    }

    /// Find the current bounds of a list, scanning its rows on first use.
    fn list_bounds(&mut self, key: &str) -> Result<Option<ListBounds>, MigrateError> {
        if let Some(bounds) = self.lists.get(key) {
            return Ok(*bounds);
        }

        let prefix = RowCodec::collection_prefix(KeyType::List, key)?;
        let mut rows = self.keyspace.prefix(&prefix);
        let seq_of = |row_key: &[u8]| {
            let row_key = String::from_utf8_lossy(row_key);
            row_key
                .strip_prefix(prefix.as_str())
                .and_then(RowCodec::decode_seq)
                .ok_or_else(|| {
                    MigrateError::store_write(format!("corrupt list row {:?}", row_key))
                })
        };

        let bounds = match rows.next() {
            None => None,
            Some(first) => {
                let first = first.key().map_err(MigrateError::store_write)?;
                let head = seq_of(&first)?;
                let tail = match rows.next_back() {
                    Some(last) => seq_of(&last.key().map_err(MigrateError::store_write)?)?,
                    None => head,
                };
                Some(ListBounds { head, tail })
            }
        };
        self.lists.insert(key.to_string(), bounds);
        Ok(bounds)
    }

    fn insert_list_item(&mut self, key: &str, item: &[u8], front: bool) -> Result<(), MigrateError> {
        let bounds = self.list_bounds(key)?;
        let (seq, bounds) = match (bounds, front) {
            (None, _) => (0, ListBounds { head: 0, tail: 0 }),
            (Some(b), true) => (b.head - 1, ListBounds { head: b.head - 1, ..b }),
            (Some(b), false) => (b.tail + 1, ListBounds { tail: b.tail + 1, ..b }),
        };
        let row_key = RowCodec::item_key(KeyType::List, key, &RowCodec::encode_seq(seq))?;
        self.insert(&row_key, item)?;
        self.lists.insert(key.to_string(), Some(bounds));
        Ok(())
    }
}

impl Destination for FjallDestination {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError> {
        self.insert(&RowCodec::string_key(key)?, value)
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError> {
        self.insert(&RowCodec::item_key(KeyType::Hash, key, field)?, value)
    }

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError> {
        self.insert(&RowCodec::item_key(KeyType::Set, key, member)?, b"")
    }

    fn sorted_set_add(
        &mut self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), MigrateError> {
        let row_key = RowCodec::item_key(KeyType::ZSet, key, member)?;
        self.insert(&row_key, &RowCodec::encode_score(score))
    }

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.insert_list_item(key, item, true)
    }

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.insert_list_item(key, item, false)
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        debug!(lists = self.lists.len(), "closing ordered destination");
        self.lists.clear();
        self.db
            .persist(PersistMode::SyncAll)
            .map_err(MigrateError::store_write)
    }
}
