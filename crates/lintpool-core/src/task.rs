//! Units of work handed to workers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::result::LintResult;
use crate::signature::FileSignature;

/// One file to lint.
///
/// `index` is the task's position in the deterministic input ordering and
/// decides where its result lands after merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub index: usize,
    pub file_path: PathBuf,
    /// Explicitly requested but matched by an ignore pattern.
    pub ignored: bool,
}

impl Task {
    /// Create a task for a file that should be linted.
    pub fn new(index: usize, file_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            file_path: file_path.into(),
            ignored: false,
        }
    }

    /// Create a task for an ignored file.
    pub fn ignored(index: usize, file_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            file_path: file_path.into(),
            ignored: true,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Build a task list from ordered `(path, ignored)` pairs.
pub fn tasks_from_paths<I, P>(paths: I) -> Vec<Task>
where
    I: IntoIterator<Item = (P, bool)>,
    P: Into<PathBuf>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(index, (path, ignored))| Task {
            index,
            file_path: path.into(),
            ignored,
        })
        .collect()
}

/// A worker's outcome for one task.
///
/// `result` is `None` for tasks that were skipped silently; the entry still
/// records that the index was claimed. `signature` describes the file
/// content the result was computed from and is `None` when there is nothing
/// worth caching (ignored or unconfigured files, read failures).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedResult {
    pub index: usize,
    pub result: Option<LintResult>,
    pub signature: Option<FileSignature>,
}

impl IndexedResult {
    /// A completed task.
    pub fn done(index: usize, result: LintResult) -> Self {
        Self {
            index,
            result: Some(result),
            signature: None,
        }
    }

    /// A task that produced nothing.
    pub fn skipped(index: usize) -> Self {
        Self {
            index,
            result: None,
            signature: None,
        }
    }

    /// Attach the signature of the content the result was computed from.
    pub fn with_signature(mut self, signature: Option<FileSignature>) -> Self {
        self.signature = signature;
        self
    }
}
