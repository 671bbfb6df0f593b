//! Writing merged results back into the result cache.

use lintpool_cache::ResultCache;
use lintpool_core::{ConfigResolver, LintError, Task};

use crate::merge::MergedResult;

/// Outcome of a reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Results written to the cache.
    pub stored: usize,
    /// Entries dropped because their files no longer exist.
    pub pruned: usize,
}

/// Store every cacheable result in `cache`, then prune removed files.
///
/// Only results carrying the signature captured when the file was read are
/// stored, so read failures, ignored tasks and files without a
/// configuration never reach the cache. Results with fixed output are
/// skipped as well since the file is about to change. The resolver is
/// expected to be memoized, so resolving again here is a lookup.
pub fn reconcile_cache(
    cache: &mut ResultCache,
    tasks: &[Task],
    ordered: &[MergedResult],
    resolver: &dyn ConfigResolver,
) -> Result<ReconcileStats, LintError> {
    let mut stats = ReconcileStats::default();

    for merged in ordered {
        let Some(signature) = &merged.signature else {
            continue;
        };
        let Some(task) = tasks.get(merged.index) else {
            continue;
        };
        if task.ignored || merged.result.output.is_some() {
            continue;
        }
        let Some(config) = resolver.resolve(task.path())? else {
            continue;
        };
        cache.store(task.path(), signature.clone(), &config.fingerprint, &merged.result);
        stats.stored += 1;
    }

    stats.pruned = cache.reconcile();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintpool_core::{CacheStrategy, FileSignature, LintConfig, LintResult, SingleConfig};
    use std::fs;
    use tempfile::TempDir;

    fn merged(index: usize, result: LintResult, signature: Option<FileSignature>) -> MergedResult {
        MergedResult {
            index,
            result,
            signature,
        }
    }

    #[test]
    fn test_reconcile_skips_ignored_and_prunes() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        let gone = temp.path().join("gone.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        fs::write(&gone, "x").unwrap();
        let sig = |path: &std::path::Path| FileSignature::compute(path, CacheStrategy::Metadata).ok();

        let resolver = SingleConfig::new(LintConfig::default()).unwrap();
        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        cache.store(
            &gone,
            FileSignature::compute(&gone, CacheStrategy::Metadata).unwrap(),
            &resolver.0.fingerprint,
            &LintResult::new(&gone, Vec::new()),
        );
        fs::remove_file(&gone).unwrap();

        let tasks = vec![Task::new(0, &a), Task::ignored(1, &b)];
        let ordered = vec![
            merged(0, LintResult::new(&a, Vec::new()), sig(&a)),
            merged(1, LintResult::ignored(&b), sig(&b)),
        ];

        let stats = reconcile_cache(&mut cache, &tasks, &ordered, &resolver).unwrap();
        assert_eq!(stats, ReconcileStats { stored: 1, pruned: 1 });
        assert!(cache.entry(&a).is_some());
        assert!(cache.entry(&b).is_none());
    }

    #[test]
    fn test_reconcile_skips_results_without_signature() {
        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked.txt");
        fs::write(&locked, "text").unwrap();

        let resolver = SingleConfig::new(LintConfig::default()).unwrap();
        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let tasks = vec![Task::new(0, &locked)];
        let ordered = vec![merged(0, LintResult::read_failure(&locked, &denied), None)];

        let stats = reconcile_cache(&mut cache, &tasks, &ordered, &resolver).unwrap();
        assert_eq!(stats.stored, 0);
        assert!(cache.is_empty());
    }
}
