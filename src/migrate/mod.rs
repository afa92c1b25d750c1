//! Migration engine: typed sources, key filtering, destinations and the copy
//! loop that connects them.
//!
//! A copy is assembled from parts:
//!
//! ```ignore
//! use kv_migrate::migrate::*;
//!
//! let source = KeyValueSource::new(db, parser);
//! let source = filter_source(source, ["^user:"], ["^user:tmp"])?;
//! let mut dst = PrefixedDestination::new("ns:", dst)?;
//! let mut recorder = StdCopyRecorder::stdout();
//!
//! let summary = copy(&source, &mut dst, &mut recorder);
//! ```

mod adapter;
mod copy;
mod destination;
mod error;
mod filter;
mod recorder;
mod source;
mod types;

pub use adapter::KeyValueSource;
pub use copy::{CopyOptions, CopySummary, ListOrder, copy, copy_with};
pub use destination::{Destination, PrefixedDestination};
pub use error::{BoxError, MigrateError};
pub use filter::{KeyPatternSource, KeyPatterns, filter_source};
pub use recorder::{CopyRecorder, ErrorContext, StdCopyRecorder};
pub use source::{
    BoxedKey, BoxedKeyIterator, KeyValueDb, RawRowIterator, RowParser, Source, SourceKey,
    SourceKeyIterator,
};
pub use types::{HashItem, ItemValue, KeyType, KeyValueItem, RawRow, ZSetMember};
