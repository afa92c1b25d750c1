use ::redis::{Cmd, Connection};

use crate::logging::{debug, trace};
use crate::migrate::{Destination, MigrateError};

/// Writes records to a live key-value server, one command per item.
pub struct ServerDestination {
    conn: Connection,
    commands: usize,
}

impl ServerDestination {
    pub fn new(conn: Connection) -> Self {
        Self { conn, commands: 0 }
    }

    /// Connect to `url` and wrap the connection.
    pub fn connect(url: &str) -> Result<Self, MigrateError> {
        super::connect(url)
            .map(Self::new)
            .map_err(MigrateError::store_write)
    }

    /// Number of write commands issued so far.
    pub fn commands(&self) -> usize {
        self.commands
    }

    fn exec(&mut self, cmd: &Cmd) -> Result<(), MigrateError> {
        self.commands += 1;
        cmd.query::<()>(&mut self.conn)
            .map_err(MigrateError::store_write)
    }
}

impl Destination for ServerDestination {
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MigrateError> {
        trace!(key = key, "SET");
        self.exec(::redis::cmd("SET").arg(key).arg(value))
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> Result<(), MigrateError> {
        self.exec(::redis::cmd("HSET").arg(key).arg(field).arg(value))
    }

    fn set_add(&mut self, key: &str, member: &str) -> Result<(), MigrateError> {
        self.exec(::redis::cmd("SADD").arg(key).arg(member))
    }

    fn sorted_set_add(
        &mut self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), MigrateError> {
        self.exec(::redis::cmd("ZADD").arg(key).arg(score).arg(member))
    }

    fn list_push(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.exec(::redis::cmd("LPUSH").arg(key).arg(item))
    }

    fn list_append(&mut self, key: &str, item: &[u8]) -> Result<(), MigrateError> {
        self.exec(::redis::cmd("RPUSH").arg(key).arg(item))
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        debug!(commands = self.commands, "closing server destination");
        Ok(())
    }
}
