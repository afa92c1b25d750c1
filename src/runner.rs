//! Assemble and run a migration from a [`MigrateConfig`].

use crate::config::{DestinationConfig, MigrateConfig, SourceConfig, StoreKind};
use crate::error::Result;
use crate::kv::{self, FjallDestination};
use crate::logging::{debug, info};
use crate::migrate::{
    CopyRecorder, CopySummary, Destination, MigrateError, PrefixedDestination, Source, copy_with,
    filter_source,
};
use crate::redis::{ServerDestination, ServerSource};

/// Open the configured source. The returned source is not filtered.
pub fn open_source(config: &SourceConfig) -> std::result::Result<Box<dyn Source>, MigrateError> {
    match config.kind {
        StoreKind::Fjall => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| MigrateError::store_read("source path is not set"))?;
            Ok(Box::new(kv::open_source(path, &config.keyspace)?))
        }
        StoreKind::Redis => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| MigrateError::store_read("source url is not set"))?;
            Ok(Box::new(
                ServerSource::connect(url)?.with_scan_count(config.scan_count),
            ))
        }
    }
}

/// Open the configured destination, wrapped in a prefix when one is set.
pub fn open_destination(
    config: &DestinationConfig,
) -> std::result::Result<Box<dyn Destination>, MigrateError> {
    let dst: Box<dyn Destination> = match config.kind {
        StoreKind::Fjall => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| MigrateError::store_write("destination path is not set"))?;
            Box::new(FjallDestination::open(path, &config.keyspace)?)
        }
        StoreKind::Redis => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| MigrateError::store_write("destination url is not set"))?;
            Box::new(ServerDestination::connect(url)?)
        }
    };

    match &config.prefix {
        Some(prefix) => Ok(Box::new(PrefixedDestination::new(prefix.clone(), dst)?)),
        None => Ok(dst),
    }
}

/// Run one complete migration.
///
/// Per-key failures go to `recorder` and are counted in the summary. Only
/// setup failures, and failures closing either end, are returned as errors.
pub fn run<R: CopyRecorder + ?Sized>(config: &MigrateConfig, recorder: &mut R) -> Result<CopySummary> {
    let options = config.copy_options()?;
    let mut source = filter_source(
        open_source(&config.source)?,
        &config.filter.includes,
        &config.filter.excludes,
    )?;
    let mut dst = open_destination(&config.destination)?;

    info!(
        source = ?config.source.kind,
        destination = ?config.destination.kind,
        "running migration"
    );
    let summary = copy_with(&*source, &mut *dst, recorder, &options);

    close_both(&mut *source, &mut *dst)?;
    Ok(summary)
}

/// Close the destination, then the source, even if the first close fails.
///
/// Returns the first failure.
pub fn close_both(
    source: &mut dyn Source,
    dst: &mut dyn Destination,
) -> std::result::Result<(), MigrateError> {
    let dst_closed = dst.close();
    let source_closed = source.close();
    debug!(
        destination_ok = dst_closed.is_ok(),
        source_ok = source_closed.is_ok(),
        "closed both ends"
    );
    dst_closed.and(source_closed)
}
