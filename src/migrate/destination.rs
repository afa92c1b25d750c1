//! Destination contract and the key-prefixing decorator.

use super::error::MigrateError;

/// A key-value server that receives migrated records.
///
/// Every write is a blind overwrite or append. `list_push` inserts at the
/// head of the list and `list_append` at the tail, so pushing items in fetch
/// order with `list_push` leaves them reversed.
pub trait Destination {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError>;

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError>;

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError>;

    fn sorted_set_add(&mut self, key: &str, member: &str, score: f64)
    -> Result<(), MigrateError>;

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError>;

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError>;

    fn close(&mut self) -> Result<(), MigrateError>;
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError> {
        (**self).set(key, value)
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError> {
        (**self).hash_set(key, field, value)
    }

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError> {
        (**self).set_add(key, member)
    }

    fn sorted_set_add(
        &mut self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), MigrateError> {
        (**self).sorted_set_add(key, member, score)
    }

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        (**self).list_push(key, item)
    }

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        (**self).list_append(key, item)
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        (**self).close()
    }
}

/// Prepends a fixed namespace to every key written to the inner destination.
///
/// Only key names are prefixed; hash fields and set members pass through.
pub struct PrefixedDestination<D> {
    inner: D,
    prefix: String,
}

impl<D: Destination> PrefixedDestination<D> {
    /// Wrap `inner`. An empty prefix is rejected.
    pub fn new(prefix: impl Into<String>, inner: D) -> Result<Self, MigrateError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(MigrateError::InvalidPrefix);
        }
        Ok(Self { inner, prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<D: Destination> Destination for PrefixedDestination<D> {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.set(&key, value)
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.hash_set(&key, field, value)
    }

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.set_add(&key, member)
    }

    fn sorted_set_add(
        &mut self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.sorted_set_add(&key, member, score)
    }

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.list_push(&key, item)
    }

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        let key = self.prefixed(key);
        self.inner.list_append(&key, item)
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.inner.close()
    }
}
