//! Cache file location and removal.

use std::io::ErrorKind;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use lintpool_core::LintError;

/// File name prefix used when the cache location is a directory.
const DIRECTORY_CACHE_PREFIX: &str = ".lintpoolcache_";

/// Resolve the cache file for `location`, relative to `cwd`.
///
/// When `location` names an existing directory, or ends with a path
/// separator, the cache file is placed inside it with a name derived from
/// `cwd` so several projects can share one cache directory.
pub fn resolve_cache_file(location: &Path, cwd: &Path) -> PathBuf {
    let resolved = cwd.join(location);
    let raw = location.to_string_lossy();
    let names_directory = raw.ends_with(MAIN_SEPARATOR) || raw.ends_with('/') || resolved.is_dir();

    if names_directory {
        let digest = blake3::hash(cwd.to_string_lossy().as_bytes()).to_hex();
        resolved.join(format!("{DIRECTORY_CACHE_PREFIX}{}", &digest[..16]))
    } else {
        resolved
    }
}

/// Remove the cache file at `path`.
///
/// Returns whether a file was removed. A missing file is not an error, and
/// neither is a read-only filesystem when the file does not exist; every
/// other failure is returned.
pub fn delete_cache_file(path: &Path) -> Result<bool, LintError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(cache = %path.display(), "deleted cache file");
            Ok(true)
        }
        Err(e) if is_ignorable_delete_error(e.kind(), path.is_file()) => Ok(false),
        Err(e) => Err(LintError::io(path, e)),
    }
}

fn is_ignorable_delete_error(kind: ErrorKind, file_exists: bool) -> bool {
    match kind {
        ErrorKind::NotFound => true,
        ErrorKind::ReadOnlyFilesystem => !file_exists,
        _ => false,
    }
}
