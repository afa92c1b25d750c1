use std::cell::RefCell;
use std::collections::VecDeque;

use ::redis::{Cmd, Connection, FromRedisValue};

use crate::logging::{debug, trace, warn};
use crate::migrate::{
    BoxedKey, BoxedKeyIterator, HashItem, KeyType, MigrateError, Source, SourceKey,
    SourceKeyIterator, ZSetMember,
};

/// Keys requested per `SCAN` round trip.
pub const DEFAULT_SCAN_COUNT: usize = 1024;

/// Typed source reading from a live key-value server.
pub struct ServerSource {
    conn: RefCell<Connection>,
    scan_count: usize,
}

impl ServerSource {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: RefCell::new(conn),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Connect to `url` and wrap the connection.
    pub fn connect(url: &str) -> Result<Self, MigrateError> {
        super::connect(url)
            .map(Self::new)
            .map_err(MigrateError::store_read)
    }

    /// Set the `COUNT` hint of each `SCAN`. Zero falls back to the default.
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = if count == 0 { DEFAULT_SCAN_COUNT } else { count };
        self
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> Result<T, MigrateError> {
        cmd.query(&mut *self.conn.borrow_mut())
            .map_err(MigrateError::store_read)
    }
}

/// Map the reply of `TYPE` onto the record model.
pub(crate) fn key_type_of(key: &str, reply: &str) -> Result<KeyType, MigrateError> {
    match reply {
        "string" => Ok(KeyType::String),
        "hash" => Ok(KeyType::Hash),
        "list" => Ok(KeyType::List),
        "set" => Ok(KeyType::Set),
        "zset" => Ok(KeyType::ZSet),
        "none" => {
            warn!(key = key, "key vanished between scan and type lookup");
            Err(MigrateError::TypeResolution {
                key: key.to_string(),
                reason: "key no longer exists".to_string(),
            })
        }
        other => Err(MigrateError::UnsupportedType {
            key: Some(key.to_string()),
            type_name: other.to_string(),
        }),
    }
}

/// Decode a scanned key name. Non-UTF-8 names come back lossily decoded with
/// `false`; they cannot be addressed through the typed accessors.
pub(crate) fn decode_key_name(raw: Vec<u8>) -> (String, bool) {
    match String::from_utf8(raw) {
        Ok(name) => (name, true),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), false),
    }
}

impl Source for ServerSource {
    fn iterator(&self) -> BoxedKeyIterator<'_> {
        Box::new(ScanIterator {
            source: self,
            cursor: 0,
            pending: VecDeque::new(),
            finished: false,
            err: None,
        })
    }

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError> {
        let value: Option<Vec<u8>> = self.query(::redis::cmd("GET").arg(key.identifier()))?;
        Ok(value.unwrap_or_default())
    }

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError> {
        let pairs: Vec<(String, Vec<u8>)> =
            self.query(::redis::cmd("HGETALL").arg(key.identifier()))?;
        Ok(pairs
            .into_iter()
            .map(|(field, value)| HashItem::new(field, value))
            .collect())
    }

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError> {
        self.query(::redis::cmd("LRANGE").arg(key.identifier()).arg(0).arg(-1))
    }

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError> {
        self.query(::redis::cmd("SMEMBERS").arg(key.identifier()))
    }

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError> {
        let pairs: Vec<(String, f64)> = self.query(
            ::redis::cmd("ZRANGE")
                .arg(key.identifier())
                .arg(0)
                .arg(-1)
                .arg("WITHSCORES"),
        )?;
        Ok(pairs
            .into_iter()
            .map(|(member, score)| ZSetMember::new(member, score))
            .collect())
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        debug!("closing server source");
        Ok(())
    }
}

struct ServerKey<'a> {
    source: &'a ServerSource,
    name: String,
    utf8: bool,
}

impl SourceKey for ServerKey<'_> {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn resolve_type(&self) -> Result<KeyType, MigrateError> {
        if !self.utf8 {
            return Err(MigrateError::TypeResolution {
                key: self.name.clone(),
                reason: "key name is not valid UTF-8".to_string(),
            });
        }
        let reply: String = self.source.query(::redis::cmd("TYPE").arg(&self.name))?;
        key_type_of(&self.name, &reply)
    }
}

/// Cursor-driven walk over the server keyspace.
///
/// A failed `SCAN` halts the walk; the failure is kept for
/// [`SourceKeyIterator::error`].
struct ScanIterator<'a> {
    source: &'a ServerSource,
    cursor: u64,
    pending: VecDeque<Vec<u8>>,
    finished: bool,
    err: Option<MigrateError>,
}

impl ScanIterator<'_> {
    fn fetch(&mut self) {
        let reply: Result<(u64, Vec<Vec<u8>>), MigrateError> = self.source.query(
            ::redis::cmd("SCAN")
                .arg(self.cursor)
                .arg("MATCH")
                .arg("*")
                .arg("COUNT")
                .arg(self.source.scan_count),
        );
        match reply {
            Ok((cursor, keys)) => {
                trace!(cursor = cursor, keys = keys.len(), "scan batch");
                self.cursor = cursor;
                self.finished = cursor == 0;
                self.pending.extend(keys);
            }
            Err(e) => {
                debug!(error = %e, "scan failed, halting iteration");
                self.finished = true;
                self.err = Some(e);
            }
        }
    }
}

impl<'a> SourceKeyIterator<'a> for ScanIterator<'a> {
    fn next(&mut self) -> Result<Option<BoxedKey<'a>>, MigrateError> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                let (name, utf8) = decode_key_name(raw);
                if !utf8 {
                    warn!(key = %name, "scanned key name is not valid UTF-8");
                }
                return Ok(Some(Box::new(ServerKey {
                    source: self.source,
                    name,
                    utf8,
                })));
            }
            if self.finished {
                return Ok(None);
            }
            self.fetch();
        }
    }

    fn error(&self) -> Option<&MigrateError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.pending.clear();
        self.finished = true;
        Ok(())
    }
}
