//! Include/exclude key filtering over any [`Source`].
//!
//! Filtering is lazy: keys flow through untouched and only
//! [`SourceKey::resolve_type`] is intercepted, reporting [`KeyType::Skip`]
//! for keys that must not be copied. Excludes take priority over includes.

use regex::Regex;

use crate::logging::{debug, trace};

use super::error::MigrateError;
use super::source::{BoxedKey, BoxedKeyIterator, Source, SourceKey, SourceKeyIterator};
use super::types::{HashItem, KeyType, ZSetMember};

/// Compiled include and exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct KeyPatterns {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl KeyPatterns {
    /// Compile both pattern lists, failing on the first invalid pattern.
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self, MigrateError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }

    /// Returns `true` if no pattern is configured.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Returns `true` if `key` passes the filter.
    pub fn allows(&self, key: &str) -> bool {
        if self.excludes.iter().any(|re| re.is_match(key)) {
            return false;
        }
        self.includes.is_empty() || self.includes.iter().any(|re| re.is_match(key))
    }

    /// Apply the filter to an already resolved type.
    pub fn classify(&self, key: &str, key_type: KeyType) -> KeyType {
        if key_type.is_skip() || self.allows(key) {
            key_type
        } else {
            trace!(key = key, "key filtered out");
            KeyType::Skip
        }
    }
}

fn compile<P>(patterns: P) -> Result<Vec<Regex>, MigrateError>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(p).map_err(|source| MigrateError::Pattern {
                pattern: p.to_string(),
                source,
            })
        })
        .collect()
}

/// A [`Source`] decorator that reclassifies filtered keys as [`KeyType::Skip`].
pub struct KeyPatternSource<S> {
    inner: S,
    patterns: KeyPatterns,
}

impl<S: Source> KeyPatternSource<S> {
    pub fn new(inner: S, patterns: KeyPatterns) -> Self {
        Self { inner, patterns }
    }

    /// Compile the pattern lists and wrap `inner`.
    pub fn with_patterns<I, E>(inner: S, includes: I, excludes: E) -> Result<Self, MigrateError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self::new(inner, KeyPatterns::new(includes, excludes)?))
    }

    pub fn patterns(&self) -> &KeyPatterns {
        &self.patterns
    }

    /// Unwrap the decorated source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// Wrap `source` in a [`KeyPatternSource`] unless both lists are empty, in
/// which case the source is returned as is.
pub fn filter_source<'s, S, I, E>(
    source: S,
    includes: I,
    excludes: E,
) -> Result<Box<dyn Source + 's>, MigrateError>
where
    S: Source + 's,
    I: IntoIterator,
    I::Item: AsRef<str>,
    E: IntoIterator,
    E::Item: AsRef<str>,
{
    let patterns = KeyPatterns::new(includes, excludes)?;
    if patterns.is_empty() {
        return Ok(Box::new(source));
    }
    debug!(
        includes = patterns.includes.len(),
        excludes = patterns.excludes.len(),
        "filtering source keys"
    );
    Ok(Box::new(KeyPatternSource::new(source, patterns)))
}

impl<S: Source> Source for KeyPatternSource<S> {
    fn iterator(&self) -> BoxedKeyIterator<'_> {
        Box::new(KeyPatternIterator {
            inner: self.inner.iterator(),
            patterns: &self.patterns,
        })
    }

    fn get_string(&self, key: &dyn SourceKey) -> Result<Vec<u8>, MigrateError> {
        self.inner.get_string(key)
    }

    fn get_hash_items(&self, key: &dyn SourceKey) -> Result<Vec<HashItem>, MigrateError> {
        self.inner.get_hash_items(key)
    }

    fn get_list_items(&self, key: &dyn SourceKey) -> Result<Vec<Vec<u8>>, MigrateError> {
        self.inner.get_list_items(key)
    }

    fn get_set_members(&self, key: &dyn SourceKey) -> Result<Vec<String>, MigrateError> {
        self.inner.get_set_members(key)
    }

    fn get_zset_members(&self, key: &dyn SourceKey) -> Result<Vec<ZSetMember>, MigrateError> {
        self.inner.get_zset_members(key)
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.inner.close()
    }
}

struct KeyPatternIterator<'a> {
    inner: BoxedKeyIterator<'a>,
    patterns: &'a KeyPatterns,
}

impl<'a> SourceKeyIterator<'a> for KeyPatternIterator<'a> {
    fn next(&mut self) -> Result<Option<BoxedKey<'a>>, MigrateError> {
        let patterns = self.patterns;
        let key = self.inner.next()?;
        Ok(key.map(|inner| Box::new(FilteredKey { inner, patterns }) as BoxedKey<'a>))
    }

    fn error(&self) -> Option<&MigrateError> {
        self.inner.error()
    }

    fn close(&mut self) -> Result<(), MigrateError> {
        self.inner.close()
    }
}

struct FilteredKey<'a> {
    inner: BoxedKey<'a>,
    patterns: &'a KeyPatterns,
}

impl SourceKey for FilteredKey<'_> {
    fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    fn resolve_type(&self) -> Result<KeyType, MigrateError> {
        let key_type = self.inner.resolve_type()?;
        Ok(self.patterns.classify(self.identifier(), key_type))
    }

    fn step(&self) -> Option<u64> {
        self.inner.step()
    }
}
