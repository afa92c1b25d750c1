//! Ordered key-value store driver backed by fjall.
//!
//! [`FjallStore`] exposes a keyspace as a [`KeyValueDb`](crate::migrate::KeyValueDb)
//! whose rows are decoded by [`RowCodec`]; wrap both in a
//! [`KeyValueSource`](crate::migrate::KeyValueSource) to copy out of it.
//! [`FjallDestination`] writes typed records back in the same layout.

mod format;
mod store;

pub use format::RowCodec;
pub use store::{FjallDestination, FjallStore};

use std::path::Path;

use crate::migrate::{KeyValueSource, MigrateError};

/// Source reading typed records from a fjall keyspace.
pub type FjallSource = KeyValueSource<FjallStore, RowCodec>;

/// Open `keyspace` under `path` as a copy source.
pub fn open_source(path: &Path, keyspace: &str) -> Result<FjallSource, MigrateError> {
    Ok(KeyValueSource::new(FjallStore::open(path, keyspace)?, RowCodec))
}
