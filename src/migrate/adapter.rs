//! Adapter turning a generic ordered byte store into a typed [`Source`].
//!
//! Every raw row is parsed into exactly one [`KeyValueItem`] while the
//! iterator advances. The item is buffered inside the source, and the
//! per-type accessors answer from that buffer instead of re-reading the
//! store. Each accessor therefore returns a one-element collection, and a
//! hash or sorted set spread across several rows reaches the destination one
//! field or member at a time.
//!
//! Every row advances a step counter. Handles carry the step that produced
//! them, so a handle from an earlier row of the same key is still rejected.

use std::cell::{Cell, RefCell};

use crate::logging::{debug, trace};

use super::error::MigrateError;
use super::source::{
    BoxedKey, BoxedKeyIterator, KeyValueDb, RawRowIterator, RowParser, Source, SourceKey,
    SourceKeyIterator,
};
use super::types::{HashItem, ItemValue, KeyType, KeyValueItem, ZSetMember};

/// Typed source over a [`KeyValueDb`] and a [`RowParser`].
pub struct KeyValueSource<D, P> {
    db: D,
    parser: P,
    current: RefCell<Option<Buffered>>,
    steps: Cell<u64>,
}

/// The item parsed at one iteration step.
struct Buffered {
    step: u64,
    item: KeyValueItem,
}

impl<D: KeyValueDb, P: RowParser> KeyValueSource<D, P> {
    pub fn new(db: D, parser: P) -> Self {
        Self {
            db,
            parser,
            current: RefCell::new(None),
            steps: Cell::new(0),
        }
    }

    /// Get a reference to the wrapped store.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Run `f` on the buffered item if `key` was produced by the current step.
    fn with_current<T>(
        &self,
        key: &dyn SourceKey,
        f: impl FnOnce(&ItemValue) -> T,
    ) -> Result<T, MigrateError> {
        let current = self.current.borrow();
        match current.as_ref() {
            Some(buffered)
                if key.step() == Some(buffered.step) && buffered.item.key == key.identifier() =>
            {
                Ok(f(&buffered.item.value))
            }
            other => Err(MigrateError::StaleKey {
                expected: other.map(|buffered| buffered.item.key.clone()),
                actual: key.identifier().to_string(),
            }),
        }
    }

    fn mismatch(key: &dyn SourceKey, wanted: KeyType, found: KeyType) -> MigrateError {
        MigrateError::TypeResolution {
            key: key.identifier().to_string(),
            reason: format!("requested {} value but buffered item is {}", wanted, found),
        }
    }
}

impl<D: KeyValueDb, P: RowParser> Source for KeyValueSource<D, P> {
    fn iterator(&self) -> BoxedKeyIterator<'_> {
        self.current.replace(None);
        Box::new(KeyValueIterator {
            rows: self.db.rows(),
            parser: &self.parser,
            current: &self.current,
            steps: &self.steps,
            err: None,
            finished: false,
        })
    }

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError> {
        self.with_current(key, |value| match value {
            ItemValue::String(bytes) => Ok(bytes.clone()),
            other => Err(Self::mismatch(key, KeyType::String, other.key_type())),
        })?
    }

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError> {
        self.with_current(key, |value| match value {
            ItemValue::Hash(item) => Ok(vec![item.clone()]),
            other => Err(Self::mismatch(key, KeyType::Hash, other.key_type())),
        })?
    }

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError> {
        self.with_current(key, |value| match value {
            ItemValue::List(item) => Ok(vec![item.clone()]),
            other => Err(Self::mismatch(key, KeyType::List, other.key_type())),
        })?
    }

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError> {
        self.with_current(key, |value| match value {
            ItemValue::Set(member) => Ok(vec![member.clone()]),
            other => Err(Self::mismatch(key, KeyType::Set, other.key_type())),
        })?
    }

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError> {
        self.with_current(key, |value| match value {
            ItemValue::ZSet(member) => Ok(vec![member.clone()]),
            other => Err(Self::mismatch(key, KeyType::ZSet, other.key_type())),
        })?
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        debug!("closing key-value source");
        self.current.replace(None);
        self.db.close()
    }
}

/// Handle for the item currently buffered in a [`KeyValueSource`].
struct BufferedKey {
    key: String,
    key_type: KeyType,
    step: u64,
}

impl SourceKey for BufferedKey {
    fn identifier(&self) -> &str {
        &self.key
    }

    fn resolve_type(&self) -> Result<KeyType, MigrateError> {
        Ok(self.key_type)
    }

    fn step(&self) -> Option<u64> {
        Some(self.step)
    }
}

struct KeyValueIterator<'a, P> {
    rows: Box<dyn RawRowIterator + 'a>,
    parser: &'a P,
    current: &'a RefCell<Option<Buffered>>,
    steps: &'a Cell<u64>,
    err: Option<MigrateError>,
    finished: bool,
}

impl<'a, P: RowParser> SourceKeyIterator<'a> for KeyValueIterator<'a, P> {
    fn next(&mut self) -> Result<Option<BoxedKey<'a>>, MigrateError> {
        if self.err.is_some() || self.finished {
            return Ok(None);
        }

        let row = match self.rows.next_row() {
            Ok(Some(row)) if !row.is_end() => row,
            Ok(_) => {
                self.finished = true;
                return Ok(None);
            }
            // An undecodable row fails on its own, like a parser error.
            Err(e) if e.is_parse() => return Err(e),
            Err(e) => {
                debug!(error = %e, "row iteration failed");
                self.err = Some(e);
                return Ok(None);
            }
        };

        let step = self.steps.get() + 1;
        self.steps.set(step);
        self.current.replace(None);

        trace!(key = %row.key, step = step, "parsing row");
        // Parse failures go straight to the caller; the row stays consumed.
        let item = self.parser.parse(&row.key, &row.value)?;
        let handle = BufferedKey {
            key: item.key.clone(),
            key_type: item.key_type(),
            step,
        };
        self.current.replace(Some(Buffered { step, item }));
        Ok(Some(Box::new(handle)))
    }

    fn error(&self) -> Option<&MigrateError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.rows.close()
    }
}
