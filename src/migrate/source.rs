//! Source-side contracts: typed sources, key handles, raw byte stores and
//! row parsers.
//!
//! Sources take `&self` for both iteration and value fetches so that the
//! copy engine can hold an iterator while it fetches the values of the key
//! it just received. Key handles and iterators borrow their source, which
//! keeps every record inside a single copy invocation.

use super::error::MigrateError;
use super::types::{HashItem, KeyType, KeyValueItem, RawRow, ZSetMember};

/// Opaque handle to one key produced by a [`SourceKeyIterator`].
pub trait SourceKey {
    /// The raw key string.
    fn identifier(&self) -> &str;

    /// Determine the semantic type of the key.
    fn resolve_type(&self) -> Result<KeyType, MigrateError>;

    /// Iteration step that produced this handle, for sources that buffer
    /// one item at a time. Decorators must forward it.
    fn step(&self) -> Option<u64> {
        None
    }
}

/// Boxed key handle borrowing its source.
pub type BoxedKey<'a> = Box<dyn SourceKey + 'a>;

/// Pull-based iterator over the keys of a source.
///
/// `next` returning `Ok(None)` means the stream is exhausted. A read failure
/// of the underlying store may end the stream early; such a failure is kept
/// and exposed through [`SourceKeyIterator::error`] instead of being returned
/// from `next`.
pub trait SourceKeyIterator<'a> {
    fn next(&mut self) -> Result<Option<BoxedKey<'a>>, MigrateError>;

    /// The error that terminated iteration, if any.
    fn error(&self) -> Option<&MigrateError>;

    fn close(&mut self) -> Result<(), MigrateError>;
}

/// Boxed key iterator borrowing its source.
pub type BoxedKeyIterator<'a> = Box<dyn SourceKeyIterator<'a> + 'a>;

/// A store that yields keys together with their values in typed shape.
pub trait Source {
    fn iterator(&self) -> BoxedKeyIterator<'_>;

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError>;

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError>;

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError>;

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError>;

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError>;

    /// Release the source and whatever store it wraps.
    fn close(&mut self) -> Result<(), MigrateError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn iterator(&self) -> BoxedKeyIterator<'_> {
        (**self).iterator()
    }

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError> {
        (**self).get_string(key)
    }

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError> {
        (**self).get_hash_items(key)
    }

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError> {
        (**self).get_list_items(key)
    }

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError> {
        (**self).get_set_members(key)
    }

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError> {
        (**self).get_zset_members(key)
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        (**self).close()
    }
}

/// Forward iterator over the rows of an ordered byte store.
///
/// End of stream is `Ok(None)` or a row with an empty key. A
/// [`MigrateError::Parse`] fails only the current row; any other error ends
/// the stream.
pub trait RawRowIterator {
    fn next_row(&mut self) -> Result<Option<RawRow>, MigrateError>;

    fn close(&mut self) -> Result<(), MigrateError>;
}

/// A generic ordered key-value database.
pub trait KeyValueDb {
    fn rows(&self) -> Box<dyn RawRowIterator + '_>;

    fn close(&mut self) -> Result<(), MigrateError>;
}

/// Decodes one raw row into a typed item.
///
/// Implementations define the on-disk encoding of a particular store. The
/// returned item's key is the logical key reported to the copy engine, which
/// need not equal the raw row key.
pub trait RowParser {
    fn parse(&self, key: &str, value: &[u8]) -> Result<KeyValueItem, MigrateError>;
}

impl<F> RowParser for F
where
    F: Fn(&str, &[u8]) -> Result<KeyValueItem, MigrateError>,
{
    fn parse(&self, key: &str, value: &[u8]) -> Result<KeyValueItem, MigrateError> {
        self(key, value)
    }
}
