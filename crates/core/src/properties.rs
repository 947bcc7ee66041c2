// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered string-to-string property map with typed accessors.
//!
//! Mirrors a `.properties`-file: keys keep the order they were inserted in,
//! values are always strings, and callers coerce to the type they need at
//! the point of use. `resolveRelativeFile` rebases a relative path against
//! the file the properties were loaded from (if any), matching how a
//! `grinder.properties` file resolves sibling paths like `grinder.script`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised by strict (non-defaulting) typed accessors.
#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("property {key:?} is not set")]
    Missing { key: String },

    #[error("property {key:?} = {value:?} is not a valid integer")]
    InvalidInt { key: String, value: String },

    #[error("property {key:?} = {value:?} is not a valid boolean")]
    InvalidBool { key: String, value: String },
}

/// An ordered string-to-string property map with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    values: IndexMap<String, String>,
    /// File this map was loaded from, used to rebase relative paths.
    #[serde(skip)]
    base_file: Option<PathBuf>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a properties map that resolves relative files against `base_file`.
    pub fn with_base_file(base_file: impl Into<PathBuf>) -> Self {
        Self { values: IndexMap::new(), base_file: Some(base_file.into()) }
    }

    pub fn base_file(&self) -> Option<&Path> {
        self.base_file.as_deref()
    }

    pub fn set_base_file(&mut self, base_file: impl Into<PathBuf>) {
        self.base_file = Some(base_file.into());
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.shift_remove(key)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Returns the parsed integer, or `default` if the key is missing or
    /// does not parse. Matches the upstream `Properties.getInt` behaviour
    /// of silently defaulting rather than failing a config load over one
    /// bad value.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    /// Strict variant of [`Properties::get_int`] that reports the bad value
    /// instead of silently defaulting; used where a malformed value should
    /// abort `PREPARING_RUN` with a `ConfigError`.
    pub fn try_get_int(&self, key: &str) -> Result<Option<i64>, PropertiesError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| PropertiesError::InvalidInt { key: key.to_string(), value: v.to_string() }),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::trim) {
            Some("true") | Some("TRUE") | Some("1") => true,
            Some("false") | Some("FALSE") | Some("0") => false,
            _ => default,
        }
    }

    /// Returns the value at `key` as a path, or `default` if unset.
    /// Relative paths are rebased against [`Properties::base_file`]'s
    /// parent directory, if one is set.
    pub fn get_file(&self, key: &str, default: &Path) -> PathBuf {
        match self.get(key) {
            Some(v) => self.resolve_relative_file(Path::new(v)),
            None => default.to_path_buf(),
        }
    }

    /// Rebase `path` against the directory containing `base_file`, if any
    /// and if `path` is relative. Absolute paths are returned unchanged.
    pub fn resolve_relative_file(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.base_file.as_ref().and_then(|f| f.parent()) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Merge `other` into `self`, overwriting any overlapping keys.
    /// Keys present only in `self` are left untouched; new keys from
    /// `other` are appended in `other`'s iteration order.
    pub fn put_all(&mut self, other: &Properties) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { values: iter.into_iter().collect(), base_file: None }
    }
}

#[cfg(test)]
#[path = "properties_tests.rs"]
mod tests;
