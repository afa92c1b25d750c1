//! Common test utilities and fixtures.
//!
//! In-memory sources, destinations and recorders with failure injection,
//! shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashSet;

use kv_migrate::migrate::{
    BoxedKey, BoxedKeyIterator, CopyRecorder, Destination, ErrorContext, HashItem, ItemValue,
    KeyType, KeyValueDb, KeyValueItem, MigrateError, RawRow, RawRowIterator, Source, SourceKey,
    SourceKeyIterator, ZSetMember,
};

// =============================================================================
// Typed source
// =============================================================================

/// Value held by one key of a [`MemorySource`].
#[derive(Debug, Clone)]
pub enum Stored {
    String(Vec<u8>),
    Hash(Vec<(String, Vec<u8>)>),
    List(Vec<Vec<u8>>),
    Set(Vec<String>),
    ZSet(Vec<(String, f64)>),
    /// Resolves to [`KeyType::Skip`].
    Skip,
    /// Resolves to an unsupported server type.
    Unsupported(String),
    /// `resolve_type` fails.
    TypeFailure,
}

#[derive(Debug, Clone)]
enum Entry {
    Key {
        name: String,
        stored: Stored,
        fail_fetch: bool,
    },
    /// `next()` returns a parse error for this step.
    ParseError(String),
    /// The iterator halts with a store error.
    Halt(String),
}

/// Scripted typed source. Keys are produced in insertion order.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: Vec<Entry>,
    fetches: Cell<usize>,
    iterator_closed: Cell<bool>,
    fail_iterator_close: bool,
    pub closed: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(mut self, name: &str, stored: Stored, fail_fetch: bool) -> Self {
        self.entries.push(Entry::Key {
            name: name.to_string(),
            stored,
            fail_fetch,
        });
        self
    }

    pub fn string(self, name: &str, value: &str) -> Self {
        self.key(name, Stored::String(value.as_bytes().to_vec()), false)
    }

    pub fn hash(self, name: &str, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.as_bytes().to_vec()))
            .collect();
        self.key(name, Stored::Hash(fields), false)
    }

    pub fn list(self, name: &str, items: &[&str]) -> Self {
        let items = items.iter().map(|i| i.as_bytes().to_vec()).collect();
        self.key(name, Stored::List(items), false)
    }

    pub fn set(self, name: &str, members: &[&str]) -> Self {
        let members = members.iter().map(|m| m.to_string()).collect();
        self.key(name, Stored::Set(members), false)
    }

    pub fn zset(self, name: &str, members: &[(&str, f64)]) -> Self {
        let members = members.iter().map(|(m, s)| (m.to_string(), *s)).collect();
        self.key(name, Stored::ZSet(members), false)
    }

    pub fn skip(self, name: &str) -> Self {
        self.key(name, Stored::Skip, false)
    }

    pub fn unsupported(self, name: &str, type_name: &str) -> Self {
        self.key(name, Stored::Unsupported(type_name.to_string()), false)
    }

    pub fn type_failure(self, name: &str) -> Self {
        self.key(name, Stored::TypeFailure, false)
    }

    /// A key whose type resolves but whose value cannot be fetched.
    pub fn fetch_failure(self, name: &str, stored: Stored) -> Self {
        self.key(name, stored, true)
    }

    pub fn parse_error(mut self, raw: &str) -> Self {
        self.entries.push(Entry::ParseError(raw.to_string()));
        self
    }

    pub fn halt(mut self, reason: &str) -> Self {
        self.entries.push(Entry::Halt(reason.to_string()));
        self
    }

    pub fn failing_iterator_close(mut self) -> Self {
        self.fail_iterator_close = true;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }

    pub fn iterator_closed(&self) -> bool {
        self.iterator_closed.get()
    }

    fn lookup(&self, key: &dyn SourceKey) -> Result<&Stored, MigrateError> {
        self.fetches.set(self.fetches.get() + 1);
        let name = key.identifier();
        self.entries
            .iter()
            .find_map(|entry| match entry {
                Entry::Key {
                    name: n,
                    stored,
                    fail_fetch,
                } if n == name => Some((stored, *fail_fetch)),
                _ => None,
            })
            .ok_or_else(|| MigrateError::store_read(format!("no such key '{}'", name)))
            .and_then(|(stored, fail_fetch)| {
                if fail_fetch {
                    Err(MigrateError::store_read("connection reset"))
                } else {
                    Ok(stored)
                }
            })
    }

    fn mismatch(key: &dyn SourceKey, wanted: KeyType) -> MigrateError {
        MigrateError::TypeResolution {
            key: key.identifier().to_string(),
            reason: format!("not a {}", wanted),
        }
    }
}

impl Source for MemorySource {
    fn iterator(&self) -> BoxedKeyIterator<'_> {
        Box::new(MemoryIterator {
            source: self,
            pos: 0,
            err: None,
        })
    }

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError> {
        match self.lookup(key)? {
            Stored::String(v) => Ok(v.clone()),
            _ => Err(Self::mismatch(key, KeyType::String)),
        }
    }

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError> {
        match self.lookup(key)? {
            Stored::Hash(fields) => Ok(fields
                .iter()
                .map(|(f, v)| HashItem::new(f.clone(), v.clone()))
                .collect()),
            _ => Err(Self::mismatch(key, KeyType::Hash)),
        }
    }

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError> {
        match self.lookup(key)? {
            Stored::List(items) => Ok(items.clone()),
            _ => Err(Self::mismatch(key, KeyType::List)),
        }
    }

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError> {
        match self.lookup(key)? {
            Stored::Set(members) => Ok(members.clone()),
            _ => Err(Self::mismatch(key, KeyType::Set)),
        }
    }

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError> {
        match self.lookup(key)? {
            Stored::ZSet(members) => Ok(members
                .iter()
                .map(|(m, s)| ZSetMember::new(m.clone(), *s))
                .collect()),
            _ => Err(Self::mismatch(key, KeyType::ZSet)),
        }
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.closed = true;
        Ok(())
    }
}

struct MemoryKey {
    name: String,
    stored: Stored,
}

impl SourceKey for MemoryKey {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn resolve_type(&self) -> Result<KeyType, MigrateError> {
        match &self.stored {
            Stored::String(_) => Ok(KeyType::String),
            Stored::Hash(_) => Ok(KeyType::Hash),
            Stored::List(_) => Ok(KeyType::List),
            Stored::Set(_) => Ok(KeyType::Set),
            Stored::ZSet(_) => Ok(KeyType::ZSet),
            Stored::Skip => Ok(KeyType::Skip),
            Stored::Unsupported(type_name) => Err(MigrateError::UnsupportedType {
                key: Some(self.name.clone()),
                type_name: type_name.clone(),
            }),
            Stored::TypeFailure => Err(MigrateError::TypeResolution {
                key: self.name.clone(),
                reason: "server timed out".to_string(),
            }),
        }
    }
}

struct MemoryIterator<'a> {
    source: &'a MemorySource,
    pos: usize,
    err: Option<MigrateError>,
}

impl<'a> SourceKeyIterator<'a> for MemoryIterator<'a> {
    fn next(&mut self) -> Result<Option<BoxedKey<'a>>, MigrateError> {
        if self.err.is_some() {
            return Ok(None);
        }
        let Some(entry) = self.source.entries.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        match entry {
            Entry::Key { name, stored, .. } => Ok(Some(Box::new(MemoryKey {
                name: name.clone(),
                stored: stored.clone(),
            }))),
            Entry::ParseError(raw) => Err(MigrateError::parse(raw.clone(), "malformed row")),
            Entry::Halt(reason) => {
                self.err = Some(MigrateError::store_read(reason.clone()));
                Ok(None)
            }
        }
    }

    fn error(&self) -> Option<&MigrateError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.source.iterator_closed.set(true);
        if self.source.fail_iterator_close {
            return Err(MigrateError::store_read("snapshot release failed"));
        }
        Ok(())
    }
}

// =============================================================================
// Raw row store
// =============================================================================

/// Ordered byte store replaying a fixed list of rows.
pub struct VecDb {
    rows: Vec<Result<RawRow, String>>,
    pub closed: bool,
}

impl VecDb {
    pub fn new(rows: Vec<Result<RawRow, String>>) -> Self {
        Self {
            rows,
            closed: false,
        }
    }
}

impl KeyValueDb for VecDb {
    fn rows(&self) -> Box<dyn RawRowIterator + '_> {
        Box::new(VecRows {
            rows: self.rows.iter(),
        })
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.closed = true;
        Ok(())
    }
}

struct VecRows<'a> {
    rows: std::slice::Iter<'a, Result<RawRow, String>>,
}

impl RawRowIterator for VecRows<'_> {
    fn next_row(&mut self) -> Result<Option<RawRow>, MigrateError> {
        match self.rows.next() {
            None => Ok(None),
            Some(Ok(row)) => Ok(Some(row.clone())),
            Some(Err(reason)) => Err(MigrateError::store_read(reason.clone())),
        }
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        Ok(())
    }
}

/// Parser for rows of the form `<type>:<key>[:<sub>]`.
///
/// Zset rows carry the score as the value. Anything else is a parse error.
pub fn colon_parser(key: &str, value: &[u8]) -> Result<KeyValueItem, MigrateError> {
    let mut parts = key.splitn(3, ':');
    let tag = parts.next().unwrap_or_default();
    let name = parts
        .next()
        .ok_or_else(|| MigrateError::parse(key, "missing key"))?;
    let sub = parts.next().unwrap_or_default();

    let item = match tag {
        "string" => ItemValue::String(value.to_vec()),
        "hash" => ItemValue::Hash(HashItem::new(sub, value)),
        "list" => ItemValue::List(value.to_vec()),
        "set" => ItemValue::Set(sub.to_string()),
        "zset" => {
            let score = String::from_utf8_lossy(value)
                .parse()
                .map_err(|_| MigrateError::parse(key, "bad score"))?;
            ItemValue::ZSet(ZSetMember::new(sub, score))
        }
        other => return Err(MigrateError::parse(key, format!("unknown tag '{}'", other))),
    };
    Ok(KeyValueItem::new(name, item))
}

pub fn row(key: &str, value: &str) -> Result<RawRow, String> {
    Ok(RawRow::new(key, value.as_bytes()))
}

// =============================================================================
// Destination
// =============================================================================

/// One destination call.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Set(String, Vec<u8>),
    HashSet(String, String, Vec<u8>),
    SetAdd(String, String),
    SortedSetAdd(String, String, f64),
    ListPush(String, Vec<u8>),
    ListAppend(String, Vec<u8>),
}

impl Op {
    pub fn key(&self) -> &str {
        match self {
            Op::Set(k, _)
            | Op::HashSet(k, _, _)
            | Op::SetAdd(k, _)
            | Op::SortedSetAdd(k, _, _)
            | Op::ListPush(k, _)
            | Op::ListAppend(k, _) => k,
        }
    }
}

pub fn set(key: &str, value: &str) -> Op {
    Op::Set(key.to_string(), value.as_bytes().to_vec())
}

pub fn hash_set(key: &str, field: &str, value: &str) -> Op {
    Op::HashSet(key.to_string(), field.to_string(), value.as_bytes().to_vec())
}

pub fn set_add(key: &str, member: &str) -> Op {
    Op::SetAdd(key.to_string(), member.to_string())
}

pub fn sorted_set_add(key: &str, member: &str, score: f64) -> Op {
    Op::SortedSetAdd(key.to_string(), member.to_string(), score)
}

pub fn list_push(key: &str, item: &str) -> Op {
    Op::ListPush(key.to_string(), item.as_bytes().to_vec())
}

pub fn list_append(key: &str, item: &str) -> Op {
    Op::ListAppend(key.to_string(), item.as_bytes().to_vec())
}

/// Destination logging every successful call. Calls on keys listed with
/// [`RecordingDestination::fail_key`] fail and are not logged.
#[derive(Debug, Default)]
pub struct RecordingDestination {
    pub ops: Vec<Op>,
    fail_keys: HashSet<String>,
    fail_close: bool,
    pub closed: bool,
}

impl RecordingDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_key(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn apply(&mut self, op: Op) -> Result<(), MigrateError> {
        if self.fail_keys.contains(op.key()) {
            return Err(MigrateError::store_write("READONLY replica"));
        }
        self.ops.push(op);
        Ok(())
    }

    /// Final contents of a list after replaying pushes and appends.
    pub fn list(&self, key: &str) -> Vec<String> {
        let mut list = std::collections::VecDeque::new();
        for op in &self.ops {
            match op {
                Op::ListPush(k, item) if k == key => {
                    list.push_front(String::from_utf8_lossy(item).into_owned())
                }
                Op::ListAppend(k, item) if k == key => {
                    list.push_back(String::from_utf8_lossy(item).into_owned())
                }
                _ => {}
            }
        }
        list.into_iter().collect()
    }
}

impl Destination for RecordingDestination {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError> {
        self.apply(Op::Set(key.to_string(), value.to_vec()))
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError> {
        self.apply(Op::HashSet(key.to_string(), field.to_string(), value.to_vec()))
    }

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError> {
        self.apply(Op::SetAdd(key.to_string(), member.to_string()))
    }

    fn sorted_set_add(
        &mut self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), MigrateError> {
        self.apply(Op::SortedSetAdd(key.to_string(), member.to_string(), score))
    }

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.apply(Op::ListPush(key.to_string(), item.to_vec()))
    }

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.apply(Op::ListAppend(key.to_string(), item.to_vec()))
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.closed = true;
        if self.fail_close {
            return Err(MigrateError::store_write("flush failed"));
        }
        Ok(())
    }
}

// =============================================================================
// Recorder
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(KeyType, String, Option<String>),
    Error {
        message: String,
        error: String,
        context: Vec<(&'static str, String)>,
    },
    Finish,
}

/// Recorder keeping every event in order.
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    pub events: Vec<Event>,
}

impl RecordingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> Vec<(KeyType, String, Option<String>)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Start(t, k, i) => Some((*t, k.clone(), i.clone())),
                _ => None,
            })
            .collect()
    }

    /// Messages of every reported error, in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Error { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finishes(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Finish).count()
    }
}

impl CopyRecorder for RecordingRecorder {
    fn on_error(&mut self, message: &str, error: &MigrateError, context: ErrorContext<'_>) {
        self.events.push(Event::Error {
            message: message.to_string(),
            error: error.to_string(),
            context: context.to_vec(),
        });
    }

    fn on_key_start(&mut self, key_type: KeyType, key: &str, item: Option<&str>) {
        self.events
            .push(Event::Start(key_type, key.to_string(), item.map(str::to_string)));
    }

    fn on_finish(&mut self) {
        self.events.push(Event::Finish);
    }
}
