//! Live key-value server driver.
//!
//! Talks to a Redis-compatible server through a blocking
//! [`redis::Connection`](::redis::Connection). [`ServerSource`] walks the
//! keyspace with `SCAN` and resolves types with `TYPE`; [`ServerDestination`]
//! writes records with the native commands of each type.

mod destination;
mod source;

pub use destination::ServerDestination;
pub use source::{DEFAULT_SCAN_COUNT, ServerSource};

use ::redis::{Client, Connection, RedisError};

use crate::logging::debug;

/// Open a connection to `url` and check it with `PING`.
///
/// Accepts any URL understood by the `redis` crate, e.g.
/// `redis://:password@127.0.0.1:6379/0`.
pub fn connect(url: &str) -> Result<Connection, RedisError> {
    let client = Client::open(url)?;
    let mut conn = client.get_connection()?;
    ::redis::cmd("PING").query::<()>(&mut conn)?;
    debug!("connected to key-value server");
    Ok(conn)
}
