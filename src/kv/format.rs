//! Row layout used to keep typed records in an ordered byte store.
//!
//! Every record occupies one row. The row key is the type tag and the
//! logical key, followed by a sub-key for collection types, joined by NUL:
//!
//! | type   | row key                  | row value          |
//! |--------|--------------------------|--------------------|
//! | string | `string\0<key>`          | payload            |
//! | hash   | `hash\0<key>\0<field>`   | field value        |
//! | list   | `list\0<key>\0<seq>`     | item               |
//! | set    | `set\0<key>\0<member>`   | empty              |
//! | zset   | `zset\0<key>\0<member>`  | score as text      |
//!
//! `<seq>` is a 16-digit hex encoding of a signed position that sorts in
//! list order, so a forward scan returns list items head first.

use crate::migrate::{HashItem, ItemValue, KeyType, KeyValueItem, MigrateError, RowParser, ZSetMember};

const SEP: char = '\0';

/// Encodes and decodes rows in the layout described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowCodec;

impl RowCodec {
    /// Row key of a string record.
    pub fn string_key(key: &str) -> Result<String, MigrateError> {
        check_segment(key)?;
        Ok(format!("{}{}{}", KeyType::String, SEP, key))
    }

    /// Row key of one record of a collection type.
    pub fn item_key(key_type: KeyType, key: &str, sub: &str) -> Result<String, MigrateError> {
        check_segment(key)?;
        check_segment(sub)?;
        Ok(format!("{}{}{}{}{}", key_type, SEP, key, SEP, sub))
    }

    /// Prefix shared by every row of one collection key.
    pub fn collection_prefix(key_type: KeyType, key: &str) -> Result<String, MigrateError> {
        check_segment(key)?;
        Ok(format!("{}{}{}{}", key_type, SEP, key, SEP))
    }

    /// Encode a list position so that byte order matches numeric order.
    pub fn encode_seq(seq: i64) -> String {
        format!("{:016x}", (seq as u64) ^ (1 << 63))
    }

    pub fn decode_seq(s: &str) -> Option<i64> {
        if s.len() != 16 {
            return None;
        }
        u64::from_str_radix(s, 16)
            .ok()
            .map(|raw| (raw ^ (1 << 63)) as i64)
    }

    pub fn encode_score(score: f64) -> Vec<u8> {
        score.to_string().into_bytes()
    }

    fn decode(&self, row_key: &str, value: &[u8]) -> Result<KeyValueItem, MigrateError> {
        let mut parts = row_key.splitn(3, SEP);
        let tag = parts.next().unwrap_or_default();
        let key = parts
            .next()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MigrateError::parse(row_key, "missing key segment"))?;
        let sub = parts.next();

        let key_type: KeyType = tag
            .parse()
            .map_err(|_| MigrateError::parse(row_key, format!("unknown type tag '{}'", tag)))?;

        let sub = match (key_type, sub) {
            (KeyType::String, None) => "",
            (KeyType::String, Some(_)) => {
                return Err(MigrateError::parse(row_key, "string row has a sub-key"));
            }
            (KeyType::Skip, _) => {
                return Err(MigrateError::parse(row_key, "skip is not a storable type"));
            }
            (_, Some(sub)) => sub,
            (_, None) => {
                return Err(MigrateError::parse(
                    row_key,
                    format!("{} row has no sub-key", key_type),
                ));
            }
        };

        let value = match key_type {
            KeyType::String => ItemValue::String(value.to_vec()),
            KeyType::Hash => ItemValue::Hash(HashItem::new(sub, value)),
            KeyType::List => {
                if Self::decode_seq(sub).is_none() {
                    return Err(MigrateError::parse(
                        row_key,
                        format!("invalid list position '{}'", sub),
                    ));
                }
                ItemValue::List(value.to_vec())
            }
            KeyType::Set => ItemValue::Set(sub.to_string()),
            KeyType::ZSet => {
                let score = std::str::from_utf8(value)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        MigrateError::parse(
                            row_key,
                            format!("invalid score '{}'", String::from_utf8_lossy(value)),
                        )
                    })?;
                ItemValue::ZSet(ZSetMember::new(sub, score))
            }
            KeyType::Skip => ItemValue::Skip,
        };

        Ok(KeyValueItem::new(key, value))
    }
}

impl RowParser for RowCodec {
    fn parse(&self, key: &str, value: &[u8]) -> Result<KeyValueItem, MigrateError> {
        self.decode(key, value)
    }
}

fn check_segment(segment: &str) -> Result<(), MigrateError> {
    if segment.contains(SEP) {
        return Err(MigrateError::store_write(format!(
            "key segment {:?} contains a NUL byte",
            segment
        )));
    }
    Ok(())
}
