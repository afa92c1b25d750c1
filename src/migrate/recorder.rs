//! Progress observers for the copy engine.

use std::io::{self, Write};

use super::error::MigrateError;
use super::types::KeyType;

/// Structured context attached to a reported error, in insertion order.
pub type ErrorContext<'a> = &'a [(&'static str, String)];

/// Receives every key start, error and the final completion of a copy.
///
/// Implementations must not fail: the engine has nowhere to report a
/// recorder failure.
pub trait CopyRecorder {
    fn on_error(&mut self, message: &str, error: &MigrateError, context: ErrorContext<'_>);

    /// Called before a key, or one item of a collection key, is written.
    fn on_key_start(&mut self, key_type: KeyType, key: &str, item: Option<&str>);

    /// Called exactly once, as the last call of a copy.
    fn on_finish(&mut self);
}

impl<R: CopyRecorder + ?Sized> CopyRecorder for &mut R {
    fn on_error(&mut self, message: &str, error: &MigrateError, context: ErrorContext<'_>) {
        (**self).on_error(message, error, context)
    }

    fn on_key_start(&mut self, key_type: KeyType, key: &str, item: Option<&str>) {
        (**self).on_key_start(key_type, key, item)
    }

    fn on_finish(&mut self) {
        (**self).on_finish()
    }
}

/// Line-oriented recorder writing one line per event.
///
/// Output looks like:
///
/// ```text
/// start: hash: users:1->name
/// set hash item failed: store write error: READONLY, type: hash, key: users:1, field: name
/// copy finished.
/// ```
pub struct StdCopyRecorder<W: Write> {
    buf: String,
    out: W,
}

impl StdCopyRecorder<io::Stdout> {
    /// Recorder writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StdCopyRecorder<W> {
    pub fn new(out: W) -> Self {
        Self {
            buf: String::new(),
            out,
        }
    }

    /// Consume the recorder and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush(&mut self) {
        // Write failures are dropped: recording must never abort a copy.
        let _ = self.out.write_all(self.buf.as_bytes());
        let _ = self.out.flush();
        self.buf.clear();
    }
}

impl<W: Write> CopyRecorder for StdCopyRecorder<W> {
    fn on_error(&mut self, message: &str, error: &MigrateError, context: ErrorContext<'_>) {
        use std::fmt::Write as _;

        self.buf.clear();
        let _ = write!(self.buf, "{}: {}", message, error);
        for (name, value) in context {
            let _ = write!(self.buf, ", {}: {}", name, value);
        }
        self.buf.push('\n');
        self.flush();
    }

    fn on_key_start(&mut self, key_type: KeyType, key: &str, item: Option<&str>) {
        self.buf.clear();
        self.buf.push_str(&match item {
            Some(item) => format!("start: {}: {}->{}\n", key_type, key, item),
            None => format!("start: {}: {}\n", key_type, key),
        });
        self.flush();
    }

    fn on_finish(&mut self) {
        self.buf.clear();
        self.buf.push_str("copy finished.\n");
        self.flush();
    }
}
