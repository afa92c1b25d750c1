//! Typed record model shared by sources, destinations and the copy engine.

use std::fmt;
use std::str::FromStr;

use super::error::MigrateError;

/// Semantic type of a key.
///
/// `Skip` marks a key that must not be copied, usually one a filter
/// excluded. The copy engine drops such keys without notifying anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Skip,
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl KeyType {
    /// Name used on the wire and in recorder output.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Skip => "skip",
            KeyType::String => "string",
            KeyType::Hash => "hash",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::ZSet => "zset",
        }
    }

    /// Returns `true` if this key was excluded by a filter.
    pub fn is_skip(&self) -> bool {
        matches!(self, KeyType::Skip)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = MigrateError;

    /// Parse a server type name. `skip` is accepted so that the names
    /// produced by [`KeyType::as_str`] parse back.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(KeyType::Skip),
            "string" => Ok(KeyType::String),
            "hash" => Ok(KeyType::Hash),
            "list" => Ok(KeyType::List),
            "set" => Ok(KeyType::Set),
            "zset" => Ok(KeyType::ZSet),
            other => Err(MigrateError::UnsupportedType {
                key: None,
                type_name: other.to_string(),
            }),
        }
    }
}

/// One field of a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashItem {
    pub field: String,
    pub value: Vec<u8>,
}

impl HashItem {
    pub fn new(field: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One member of a sorted set.
#[derive(Debug, Clone, PartialEq)]
pub struct ZSetMember {
    pub member: String,
    pub score: f64,
}

impl ZSetMember {
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

impl fmt::Display for ZSetMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.member, self.score)
    }
}

/// The single value carried by a parsed raw row.
///
/// Each variant holds exactly the shape that belongs to its key type, so an
/// item can never declare one type and carry another's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    /// The parser chose to drop this row.
    Skip,
    String(Vec<u8>),
    Hash(HashItem),
    List(Vec<u8>),
    Set(String),
    ZSet(ZSetMember),
}

impl ItemValue {
    pub fn key_type(&self) -> KeyType {
        match self {
            ItemValue::Skip => KeyType::Skip,
            ItemValue::String(_) => KeyType::String,
            ItemValue::Hash(_) => KeyType::Hash,
            ItemValue::List(_) => KeyType::List,
            ItemValue::Set(_) => KeyType::Set,
            ItemValue::ZSet(_) => KeyType::ZSet,
        }
    }
}

/// A raw row after parsing: the logical key and its typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueItem {
    pub key: String,
    pub value: ItemValue,
}

impl KeyValueItem {
    pub fn new(key: impl Into<String>, value: ItemValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.value.key_type()
    }
}

/// An undecoded row produced by an ordered byte store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub key: String,
    pub value: Vec<u8>,
}

impl RawRow {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// An empty key marks the end of the stream.
    pub fn is_end(&self) -> bool {
        self.key.is_empty()
    }
}
