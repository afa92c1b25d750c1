//! Copy typed key-value data between stores.
//!
//! A migration reads keys from a [`Source`](migrate::Source), optionally
//! filters them by name, and writes each key's value in its native shape
//! (string, hash, list, set or sorted set) to a
//! [`Destination`](migrate::Destination). Failures are reported per item to
//! a [`CopyRecorder`](migrate::CopyRecorder) and never abort the copy.
//!
//! # Quick Start
//!
//! ```ignore
//! use kv_migrate::prelude::*;
//! use std::path::Path;
//!
//! let source = kv_migrate::kv::open_source(Path::new("./data"), "default")?;
//! let source = filter_source(source, ["^user:"], Vec::<String>::new())?;
//! let mut dst = ServerDestination::connect("redis://127.0.0.1:6380/0")?;
//! let mut recorder = StdCopyRecorder::stdout();
//!
//! let summary = copy(&source, &mut dst, &mut recorder);
//! ```
//!
//! # Modules
//!
//! - [`migrate`] - Record model, traits and the copy engine (always available)
//! - [`kv`] - Ordered store driver backed by fjall (requires `kv` feature)
//! - [`redis`] - Live key-value server driver (requires `redis` feature)
//!
//! # Feature Flags
//!
//! - `kv` - Enable the ordered store driver (enabled by default)
//! - `redis` - Enable the key-value server driver (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable configuration loading and the command-line binary
//! - `full` - Enable all features

mod logging;

#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "kv")]
pub mod kv;
pub mod migrate;
pub mod prelude;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(all(feature = "cli", feature = "kv", feature = "redis"))]
pub mod runner;
#[cfg(feature = "cli")]
pub mod subscriber;

mod error;

// Re-export the unified error type
pub use error::{Error, Result};

// Re-export the engine entry points at crate root for convenience
pub use migrate::{CopyOptions, CopySummary, ListOrder, MigrateError, copy, copy_with};

#[cfg(feature = "cli")]
pub use config::{ConfigError, MigrateConfig};
