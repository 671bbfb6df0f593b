//! Error types for lint dispatch.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a lint invocation.
///
/// Problems confined to a single file (unreadable source, parse failures
/// reported by the analyzer) are not errors at this level; they surface as
/// fatal messages inside that file's [`LintResult`](crate::LintResult).
#[derive(Debug, Error)]
pub enum LintError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be loaded or parsed.
    #[error("Failed to load configuration {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    /// The analyzer failed in a way that invalidates the whole run.
    #[error("Analyzer failed on {path}: {message}")]
    Analyzer { path: PathBuf, message: String },

    /// A worker thread panicked.
    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// The worker thread pool could not be created.
    #[error("Failed to start worker pool: {message}")]
    PoolStart { message: String },

    /// A pattern given on the command line matched no files.
    #[error("No files matching the pattern \"{pattern}\" were found")]
    NoFilesFound { pattern: String },

    /// The cache file exists but could not be written or removed.
    #[error("Cache error at {path}: {message}")]
    Cache { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl LintError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an analyzer failure.
    pub fn analyzer(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Analyzer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration load failure.
    pub fn config_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lint_error_io() {
        let err = LintError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, LintError::PermissionDenied { .. }));

        let err = LintError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, LintError::NotFound { .. }));

        let err = LintError::io("/test/path", std::io::Error::other("boom"));
        assert!(matches!(err, LintError::Io { .. }));
    }

    #[test]
    fn test_error_messages_carry_path() {
        let err = LintError::config_load("/proj/.lintpool.toml", "expected `=`");
        let text = err.to_string();
        assert!(text.contains("/proj/.lintpool.toml"));
        assert!(text.contains("expected `=`"));
    }
}
