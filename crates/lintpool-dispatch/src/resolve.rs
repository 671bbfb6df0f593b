//! Expansion of path patterns into an ordered task list.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use jwalk::WalkDir;

use lintpool_core::{DispatchOptions, LintError, Task};

/// Directories never descended into and always treated as ignored.
const DEFAULT_IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Turns user-supplied patterns into tasks.
///
/// Files named explicitly always become tasks, flagged `ignored` when an
/// ignore pattern matches them. Files found by walking a directory or
/// matching a glob are dropped silently when ignored.
#[derive(Debug)]
pub struct TaskSetResolver {
    cwd: PathBuf,
    ignore: GlobSet,
    extensions: Vec<String>,
    error_on_unmatched_pattern: bool,
}

impl TaskSetResolver {
    /// Create a resolver from dispatch options.
    pub fn new(options: &DispatchOptions) -> Result<Self, LintError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.ignore_patterns {
            builder.add(compile_glob(pattern)?);
        }
        let ignore = builder.build().map_err(|e| LintError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(Self {
            cwd: options.cwd.clone(),
            ignore,
            extensions: options
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            error_on_unmatched_pattern: options.error_on_unmatched_pattern,
        })
    }

    /// Expand `patterns` into tasks sorted by path, indexed in that order.
    pub fn resolve<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<Task>, LintError> {
        let mut found: BTreeMap<PathBuf, bool> = BTreeMap::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let target = normalize(&self.cwd.join(pattern));
            let before = found.len();
            let mut matched = false;

            if target.is_file() {
                let ignored = self.is_ignored(&target);
                found.entry(target).or_insert(ignored);
                matched = true;
            } else if target.is_dir() {
                for file in self.walk(&target) {
                    if !self.is_ignored(&file) && self.has_lintable_extension(&file) {
                        found.entry(file).or_insert(false);
                        matched = true;
                    }
                }
            } else {
                let matcher = compile_glob(pattern)?.compile_matcher();
                for file in self.walk(&self.cwd) {
                    if self.matches_glob(&matcher, &file) && !self.is_ignored(&file) {
                        found.entry(file).or_insert(false);
                        matched = true;
                    }
                }
            }

            if !matched && self.error_on_unmatched_pattern {
                return Err(LintError::NoFilesFound {
                    pattern: pattern.to_string(),
                });
            }
            tracing::debug!(pattern, files = found.len() - before, "expanded pattern");
        }

        Ok(found
            .into_iter()
            .enumerate()
            .map(|(index, (path, ignored))| Task {
                index,
                file_path: path,
                ignored,
            })
            .collect())
    }

    /// Whether `path` matches an ignore pattern or sits in a default-ignored directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
        relative
            .components()
            .any(|c| DEFAULT_IGNORED_DIRS.iter().any(|d| c.as_os_str() == OsStr::new(d)))
            || self.ignore.is_match(relative)
    }

    fn has_lintable_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn matches_glob(&self, matcher: &GlobMatcher, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
        matcher.is_match(relative) || matcher.is_match(path)
    }

    /// All regular files under `root`, skipping default-ignored directories.
    fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir(|_depth, _path, _state, children| {
                children.retain(|entry| {
                    entry.as_ref().map_or(true, |e| {
                        !(e.file_type().is_dir()
                            && DEFAULT_IGNORED_DIRS
                                .iter()
                                .any(|d| e.file_name() == OsStr::new(d)))
                    })
                });
            });

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(normalize(&entry.path())),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                }
            }
        }
        files
    }
}

fn compile_glob(pattern: &str) -> Result<Glob, LintError> {
    Glob::new(pattern).map_err(|e| LintError::InvalidConfig {
        message: format!("invalid pattern \"{pattern}\": {e}"),
    })
}

/// Drop `.` components so the same file always has the same key.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();

        fs::write(root.join("readme.md"), "# readme").unwrap();
        fs::write(root.join("src/a.txt"), "a").unwrap();
        fs::write(root.join("src/nested/b.txt"), "b").unwrap();
        fs::write(root.join("src/image.png"), "png").unwrap();
        fs::write(root.join("node_modules/dep/c.txt"), "c").unwrap();
        fs::write(root.join("dist/out.txt"), "out").unwrap();

        temp
    }

    fn options(root: &Path, ignore: &[&str]) -> DispatchOptions {
        DispatchOptions::builder()
            .cwd(root)
            .ignore_patterns(ignore.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .build()
            .unwrap()
    }

    #[test]
    fn test_directory_walk_filters_and_sorts() {
        let temp = create_test_tree();
        let resolver = TaskSetResolver::new(&options(temp.path(), &["dist/**"])).unwrap();

        let tasks = resolver.resolve(&["."]).unwrap();
        let paths: Vec<_> = tasks
            .iter()
            .map(|t| t.file_path.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("readme.md"),
                PathBuf::from("src/a.txt"),
                PathBuf::from("src/nested/b.txt"),
            ]
        );
        assert!(tasks.iter().all(|t| !t.ignored));
        assert_eq!(tasks.iter().map(|t| t.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_explicit_ignored_file_is_flagged() {
        let temp = create_test_tree();
        let resolver = TaskSetResolver::new(&options(temp.path(), &["dist/**"])).unwrap();

        let tasks = resolver.resolve(&["dist/out.txt", "src/a.txt"]).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].ignored);
        assert!(!tasks[1].ignored);

        let tasks = resolver.resolve(&["node_modules/dep/c.txt"]).unwrap();
        assert!(tasks[0].ignored);
    }

    #[test]
    fn test_glob_pattern() {
        let temp = create_test_tree();
        let resolver = TaskSetResolver::new(&options(temp.path(), &[])).unwrap();

        let tasks = resolver.resolve(&["src/**/*.txt"]).unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_duplicates_removed() {
        let temp = create_test_tree();
        let resolver = TaskSetResolver::new(&options(temp.path(), &[])).unwrap();

        let tasks = resolver.resolve(&["src/a.txt", "./src/a.txt", "src"]).unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_unmatched_pattern() {
        let temp = create_test_tree();
        let resolver = TaskSetResolver::new(&options(temp.path(), &[])).unwrap();
        let err = resolver.resolve(&["nothing/*.txt"]).unwrap_err();
        assert!(matches!(err, LintError::NoFilesFound { .. }));

        let lenient = DispatchOptions::builder()
            .cwd(temp.path())
            .error_on_unmatched_pattern(false)
            .build()
            .unwrap();
        let resolver = TaskSetResolver::new(&lenient).unwrap();
        assert!(resolver.resolve(&["nothing/*.txt"]).unwrap().is_empty());
    }
}
