//! Workers that claim and lint tasks.

use std::io;
use std::path::Path;
use std::sync::Arc;

use lintpool_cache::ResultCache;
use lintpool_core::{
    AnalyzeRequest, CacheStrategy, ConfigResolver, DeprecationSource, FileAnalyzer, FileSignature,
    FixMode, IndexedResult, LintError, LintResult, RuleCatalog, Task,
};

use crate::cursor::SharedCursor;

/// Read-only state shared by every worker of one dispatch.
pub struct WorkerContext<'a> {
    /// The full task list, in input order.
    pub tasks: &'a [Task],
    pub cursor: &'a SharedCursor,
    pub resolver: &'a dyn ConfigResolver,
    pub analyzer: &'a dyn FileAnalyzer,
    /// Rule metadata for lazily computed deprecation lists.
    pub catalog: Arc<dyn RuleCatalog>,
    /// Loaded result cache, when caching is enabled.
    pub cache: Option<&'a ResultCache>,
    pub fix: &'a FixMode,
    /// Report ignored tasks instead of dropping them.
    pub warn_ignored: bool,
}

impl WorkerContext<'_> {
    /// Number of tasks in this dispatch.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// Per-worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Files handed to the analyzer.
    pub analyzed: usize,
    /// Files answered from the cache.
    pub cache_hits: usize,
    /// Ignored files dropped without a result.
    pub skipped: usize,
    /// Ignored files reported with a warning.
    pub ignored: usize,
}

impl WorkerStats {
    /// Add another worker's counters.
    pub fn absorb(&mut self, other: &WorkerStats) {
        self.analyzed += other.analyzed;
        self.cache_hits += other.cache_hits;
        self.skipped += other.skipped;
        self.ignored += other.ignored;
    }
}

/// What a worker hands back when the cursor runs dry.
#[derive(Debug, Default)]
pub struct WorkerReport {
    /// One entry per claimed task, in claim order.
    pub batch: Vec<IndexedResult>,
    pub stats: WorkerStats,
}

/// A single worker.
#[derive(Debug, Clone, Copy)]
pub struct Worker {
    id: usize,
}

impl Worker {
    /// Create a worker.
    pub fn new(id: usize) -> Self {
        Self { id }
    }

    /// Worker id within its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Claim and lint tasks until the cursor is exhausted.
    ///
    /// The first error ends the loop and is returned as is; results gathered
    /// so far are dropped with the report.
    pub fn run(&self, ctx: &WorkerContext<'_>) -> Result<WorkerReport, LintError> {
        let mut report = WorkerReport::default();
        let task_count = ctx.task_count();

        loop {
            let index = ctx.cursor.claim_next();
            if index >= task_count {
                break;
            }

            let task = &ctx.tasks[index];
            let outcome = self.process(ctx, task, &mut report.stats)?;
            report.batch.push(outcome);
        }

        tracing::debug!(
            worker = self.id,
            claimed = report.batch.len(),
            analyzed = report.stats.analyzed,
            cache_hits = report.stats.cache_hits,
            "worker finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        ctx: &WorkerContext<'_>,
        task: &Task,
        stats: &mut WorkerStats,
    ) -> Result<IndexedResult, LintError> {
        let path = task.path();

        if task.ignored {
            if !ctx.warn_ignored {
                stats.skipped += 1;
                return Ok(IndexedResult::skipped(task.index));
            }
            stats.ignored += 1;
            return Ok(IndexedResult::done(task.index, LintResult::ignored(path)));
        }

        let Some(config) = ctx.resolver.resolve(path)? else {
            return Ok(IndexedResult::done(task.index, LintResult::unconfigured(path)));
        };
        let deprecations = DeprecationSource::new(Arc::clone(&config), Arc::clone(&ctx.catalog));

        if let Some(cache) = ctx.cache {
            if let Some(mut cached) = cache.lookup(path, &config) {
                if cached.has_messages() && ctx.fix.is_requested() {
                    tracing::debug!(file = %path.display(), "reprocessing cached file to allow autofix");
                } else {
                    tracing::debug!(file = %path.display(), "skipping file since it hasn't changed");
                    cached.bind_deprecations(deprecations);
                    stats.cache_hits += 1;
                    let signature = cache.entry(path).map(|entry| entry.signature.clone());
                    return Ok(IndexedResult::done(task.index, cached).with_signature(signature));
                }
            }
        }

        let strategy = ctx.cache.map(ResultCache::strategy);
        let (source, signature) = match read_source(path, strategy) {
            Ok(read) => read,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "cannot read file");
                return Ok(IndexedResult::done(task.index, LintResult::read_failure(path, &e)));
            }
        };

        let request = AnalyzeRequest {
            path,
            source: &source,
            config: &config,
            fix: ctx.fix,
        };
        let mut result = ctx.analyzer.analyze(&request)?;
        stats.analyzed += 1;

        if result.has_messages() && result.output.is_none() {
            result.source = Some(source);
        }
        result.bind_deprecations(deprecations);

        Ok(IndexedResult::done(task.index, result).with_signature(signature))
    }
}

/// Read a file as UTF-8, capturing its signature when a cache strategy is given.
fn read_source(
    path: &Path,
    strategy: Option<CacheStrategy>,
) -> io::Result<(String, Option<FileSignature>)> {
    let Some(strategy) = strategy else {
        return Ok((std::fs::read_to_string(path)?, None));
    };

    let (bytes, signature) = FileSignature::read(path, strategy)?;
    let source =
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok((source, Some(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintpool_core::{LintConfig, LintMessage, Severity, SingleConfig};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct WordCounter {
        calls: AtomicUsize,
    }

    impl RuleCatalog for WordCounter {}

    impl FileAnalyzer for WordCounter {
        fn name(&self) -> &'static str {
            "word-counter"
        }

        fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<LintResult, LintError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let messages = if request.source.contains("bad") {
                vec![LintMessage::new("no-bad", Severity::Error, "bad word", 1, 1)]
            } else {
                Vec::new()
            };
            Ok(LintResult::new(request.path, messages))
        }
    }

    #[test]
    fn test_worker_processes_every_task() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.txt");
        let bad = temp.path().join("bad.txt");
        fs::write(&good, "fine").unwrap();
        fs::write(&bad, "bad").unwrap();

        let tasks = vec![
            Task::new(0, &good),
            Task::new(1, &bad),
            Task::ignored(2, temp.path().join("skip.txt")),
            Task::new(3, temp.path().join("missing.txt")),
        ];
        let analyzer = Arc::new(WordCounter {
            calls: AtomicUsize::new(0),
        });
        let resolver = SingleConfig::new(LintConfig::default()).unwrap();
        let cursor = SharedCursor::new();
        let fix = FixMode::Off;
        let ctx = WorkerContext {
            tasks: &tasks,
            cursor: &cursor,
            resolver: &resolver,
            analyzer: &*analyzer,
            catalog: analyzer.clone(),
            cache: None,
            fix: &fix,
            warn_ignored: false,
        };

        let report = Worker::new(0).run(&ctx).unwrap();

        assert_eq!(report.batch.len(), 4);
        assert_eq!(report.stats.analyzed, 2);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);

        let bad_result = report.batch[1].result.as_ref().unwrap();
        assert_eq!(bad_result.error_count, 1);
        assert_eq!(bad_result.source.as_deref(), Some("bad"));
        assert!(report.batch[0].result.as_ref().unwrap().source.is_none());
        assert!(report.batch[2].result.is_none());

        let missing = report.batch[3].result.as_ref().unwrap();
        assert_eq!(missing.fatal_error_count, 1);
    }

    #[test]
    fn test_signature_follows_the_read_and_read_failures_have_none() {
        let temp = TempDir::new().unwrap();
        let text = temp.path().join("a.txt");
        let binary = temp.path().join("b.bin");
        fs::write(&text, "bad").unwrap();
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();

        let tasks = vec![
            Task::new(0, &text),
            Task::new(1, &binary),
            Task::new(2, temp.path().join("missing.txt")),
        ];
        let analyzer = Arc::new(WordCounter {
            calls: AtomicUsize::new(0),
        });
        let resolver = SingleConfig::new(LintConfig::default()).unwrap();
        let cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Content);
        let cursor = SharedCursor::new();
        let fix = FixMode::Off;
        let ctx = WorkerContext {
            tasks: &tasks,
            cursor: &cursor,
            resolver: &resolver,
            analyzer: &*analyzer,
            catalog: analyzer.clone(),
            cache: Some(&cache),
            fix: &fix,
            warn_ignored: true,
        };

        let report = Worker::new(0).run(&ctx).unwrap();

        let signature = report.batch[0].signature.as_ref().unwrap();
        assert_eq!(signature.size, 3);
        assert_eq!(
            signature,
            &FileSignature::compute(&text, CacheStrategy::Content).unwrap()
        );

        for entry in &report.batch[1..] {
            assert_eq!(entry.result.as_ref().unwrap().fatal_error_count, 1);
            assert!(entry.signature.is_none());
        }
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }
}
