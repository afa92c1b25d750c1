//! The copy engine.
//!
//! [`copy`] pulls keys from a [`Source`] one at a time, fetches each key's
//! value in its typed shape and writes it item by item to a
//! [`Destination`]. Nothing aborts a copy: every failed iteration step,
//! type lookup, fetch or write is handed to the [`CopyRecorder`] and the
//! engine moves on to the next item or key. Failed operations are never
//! retried.

use crate::logging::{debug, info};

use super::destination::Destination;
use super::error::MigrateError;
use super::recorder::CopyRecorder;
use super::source::{Source, SourceKey};
use super::types::KeyType;

/// Where migrated list items land in the destination list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Push each fetched item to the head of the list. The destination ends
    /// up holding the items in reverse fetch order.
    #[default]
    Prepend,
    /// Push each fetched item to the tail, keeping fetch order.
    Append,
}

impl std::str::FromStr for ListOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepend" => Ok(ListOrder::Prepend),
            "append" => Ok(ListOrder::Append),
            other => Err(format!(
                "invalid list order '{}', expected 'prepend' or 'append'",
                other
            )),
        }
    }
}

/// Tunables for a copy.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub list_order: ListOrder,
}

/// Counters collected during a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Keys dispatched to the destination.
    pub keys: usize,
    /// Items written successfully.
    pub items: usize,
    /// Keys dropped because they resolved to [`KeyType::Skip`].
    pub skipped: usize,
    /// Errors handed to the recorder.
    pub errors: usize,
}

impl CopySummary {
    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        format!(
            "Copied: {} keys, {} items written, {} skipped, {} errors",
            self.keys, self.items, self.skipped, self.errors
        )
    }
}

/// Copy every key of `src` into `dst` with default options.
pub fn copy<S, D, R>(src: &S, dst: &mut D, recorder: &mut R) -> CopySummary
where
    S: Source + ?Sized,
    D: Destination + ?Sized,
    R: CopyRecorder + ?Sized,
{
    copy_with(src, dst, recorder, &CopyOptions::default())
}

/// Copy every key of `src` into `dst`.
///
/// The source iterator is always closed, and `recorder.on_finish()` is
/// always the last recorder call.
pub fn copy_with<S, D, R>(
    src: &S,
    dst: &mut D,
    recorder: &mut R,
    options: &CopyOptions,
) -> CopySummary
where
    S: Source + ?Sized,
    D: Destination + ?Sized,
    R: CopyRecorder + ?Sized,
{
    info!(list_order = ?options.list_order, "starting copy");

    let mut run = CopyRun {
        dst,
        recorder,
        options,
        summary: CopySummary::default(),
    };

    let mut iter = src.iterator();
    loop {
        let key = match iter.next() {
            Ok(Some(key)) => key,
            Ok(None) => break,
            Err(e) => {
                run.fail("iterate next key failed", &e, &[]);
                continue;
            }
        };
        run.copy_key(src, key.as_ref());
    }

    if let Some(e) = iter.error() {
        run.fail("iterator errors", e, &[]);
    }
    if let Err(e) = iter.close() {
        run.fail("close source iterator failed", &e, &[]);
    }

    info!(
        keys = run.summary.keys,
        items = run.summary.items,
        skipped = run.summary.skipped,
        errors = run.summary.errors,
        "copy finished"
    );
    run.recorder.on_finish();
    run.summary
}

struct CopyRun<'r, D: ?Sized, R: ?Sized> {
    dst: &'r mut D,
    recorder: &'r mut R,
    options: &'r CopyOptions,
    summary: CopySummary,
}

impl<D, R> CopyRun<'_, D, R>
where
    D: Destination + ?Sized,
    R: CopyRecorder + ?Sized,
{
    fn fail(&mut self, message: &str, error: &MigrateError, context: &[(&'static str, String)]) {
        self.summary.errors += 1;
        self.recorder.on_error(message, error, context);
    }

    /// Record the outcome of a single destination write.
    fn written(
        &mut self,
        result: Result<(), MigrateError>,
        message: &str,
        context: &[(&'static str, String)],
    ) {
        match result {
            Ok(()) => self.summary.items += 1,
            Err(e) => self.fail(message, &e, context),
        }
    }

    fn copy_key<S: Source + ?Sized>(&mut self, src: &S, key: &dyn SourceKey) {
        let name = key.identifier();

        let key_type = match key.resolve_type() {
            Ok(key_type) => key_type,
            Err(e @ MigrateError::UnsupportedType { .. }) => {
                self.fail("unsupported key type", &e, &[("key", name.to_string())]);
                return;
            }
            Err(e) => {
                self.fail("retrieve key type failed", &e, &[("key", name.to_string())]);
                return;
            }
        };

        if key_type.is_skip() {
            self.summary.skipped += 1;
            return;
        }

        debug!(key = name, key_type = %key_type, "copying key");
        self.summary.keys += 1;
        let base = [("type", key_type.to_string()), ("key", name.to_string())];

        match key_type {
            KeyType::Skip => {}
            KeyType::String => match src.get_string(key) {
                Err(e) => self.fail("get string key value failed", &e, &base),
                Ok(value) => {
                    self.recorder.on_key_start(key_type, name, None);
                    let result = self.dst.set(name, &value);
                    self.written(result, "set string key value failed", &base);
                }
            },
            KeyType::Hash => match src.get_hash_items(key) {
                Err(e) => self.fail("get hash items failed", &e, &base),
                Ok(items) => {
                    for item in items {
                        self.recorder.on_key_start(key_type, name, Some(item.field.as_str()));
                        let result = self.dst.hash_set(name, &item.field, &item.value);
                        self.written(
                            result,
                            "set hash item failed",
                            &with_context(&base, "field", item.field),
                        );
                    }
                }
            },
            KeyType::List => match src.get_list_items(key) {
                Err(e) => self.fail("get list items failed", &e, &base),
                Ok(items) => {
                    for item in items {
                        let shown = String::from_utf8_lossy(&item).into_owned();
                        self.recorder.on_key_start(key_type, name, Some(shown.as_str()));
                        let result = match self.options.list_order {
                            ListOrder::Prepend => self.dst.list_push(name, &item),
                            ListOrder::Append => self.dst.list_append(name, &item),
                        };
                        self.written(
                            result,
                            "push list item failed",
                            &with_context(&base, "item", shown),
                        );
                    }
                }
            },
            KeyType::Set => match src.get_set_members(key) {
                Err(e) => self.fail("get set members failed", &e, &base),
                Ok(members) => {
                    for member in members {
                        self.recorder.on_key_start(key_type, name, Some(member.as_str()));
                        let result = self.dst.set_add(name, &member);
                        self.written(
                            result,
                            "add set member failed",
                            &with_context(&base, "member", member),
                        );
                    }
                }
            },
            KeyType::ZSet => match src.get_zset_members(key) {
                Err(e) => self.fail("get zset members failed", &e, &base),
                Ok(members) => {
                    for member in members {
                        self.recorder.on_key_start(key_type, name, Some(member.member.as_str()));
                        let result = self.dst.sorted_set_add(name, &member.member, member.score);
                        self.written(
                            result,
                            "add zset member failed",
                            &with_context(&base, "member", member.to_string()),
                        );
                    }
                }
            },
        }
    }
}

fn with_context(
    base: &[(&'static str, String)],
    name: &'static str,
    value: String,
) -> Vec<(&'static str, String)> {
    let mut context = base.to_vec();
    context.push((name, value));
    context
}
