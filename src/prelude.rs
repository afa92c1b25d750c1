//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```ignore
//! use kv_migrate::prelude::*;
//!
//! let src = ServerSource::connect("redis://127.0.0.1:6379/0")?;
//! let mut dst = PrefixedDestination::new("copy:", ServerDestination::connect(url)?)?;
//! copy(&src, &mut dst, &mut StdCopyRecorder::stdout());
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Engine, traits and record model
pub use crate::migrate::{
    CopyOptions, CopyRecorder, CopySummary, Destination, HashItem, ItemValue, KeyPatternSource,
    KeyPatterns, KeyType, KeyValueDb, KeyValueItem, KeyValueSource, ListOrder, MigrateError,
    PrefixedDestination, RawRow, RawRowIterator, RowParser, Source, SourceKey, SourceKeyIterator,
    StdCopyRecorder, ZSetMember, copy, copy_with, filter_source,
};

// Ordered store driver (requires "kv" feature)
#[cfg(feature = "kv")]
pub use crate::kv::{FjallDestination, FjallSource, FjallStore, RowCodec};

// Key-value server driver (requires "redis" feature)
#[cfg(feature = "redis")]
pub use crate::redis::{ServerDestination, ServerSource};

// Configuration (requires "cli" feature)
#[cfg(feature = "cli")]
pub use crate::config::{ConfigError, MigrateConfig};
