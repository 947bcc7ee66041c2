// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's script entry point and its resolution root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A script entry point and the directory relative imports resolve against.
///
/// Invariant: `directory` always contains or is an ancestor of `file`.
/// [`ScriptLocation::new`] enforces this by deriving `directory` from
/// `file`'s parent when one isn't supplied explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLocation {
    directory: PathBuf,
    file: PathBuf,
}

/// The script file's directory was not an ancestor of the file itself.
#[derive(Debug, thiserror::Error)]
#[error("script directory {directory:?} does not contain script file {file:?}")]
pub struct ScriptLocationError {
    pub directory: PathBuf,
    pub file: PathBuf,
}

impl ScriptLocation {
    /// Build a location rooted at `file`'s own parent directory.
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let directory = file.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        Self { directory, file }
    }

    /// Build a location with an explicit resolution root, validating that
    /// `directory` is an ancestor of (or equal to the parent of) `file`.
    pub fn new(
        directory: impl Into<PathBuf>,
        file: impl Into<PathBuf>,
    ) -> Result<Self, ScriptLocationError> {
        let directory = directory.into();
        let file = file.into();
        if file.starts_with(&directory) {
            Ok(Self { directory, file })
        } else {
            Err(ScriptLocationError { directory, file })
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
