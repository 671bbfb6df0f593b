//! One complete lint invocation.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lintpool_cache::{ResultCache, delete_cache_file, resolve_cache_file};
use lintpool_core::{
    ConfigResolver, DispatchOptions, FileAnalyzer, LintError, LintResult, RuleCatalog, Task,
};

use crate::concurrency::resolve_worker_count;
use crate::cursor::SharedCursor;
use crate::merge::merge_indexed;
use crate::pool::Supervisor;
use crate::reconcile::{ReconcileStats, reconcile_cache};
use crate::resolve::TaskSetResolver;
use crate::worker::{WorkerContext, WorkerStats};

/// Results of a successful dispatch.
#[derive(Debug)]
pub struct DispatchReport {
    /// One result per reported file, in task order.
    pub results: Vec<LintResult>,
    /// Summed worker counters.
    pub stats: WorkerStats,
    /// Workers that ran.
    pub worker_count: usize,
    /// Cache bookkeeping, when caching was enabled.
    pub cache: Option<ReconcileStats>,
    /// Wall-clock time of the dispatch.
    pub duration: Duration,
}

impl DispatchReport {
    /// Total error-severity messages across all results.
    pub fn error_count(&self) -> usize {
        self.results.iter().map(|r| r.error_count).sum()
    }

    /// Total warnings across all results.
    pub fn warning_count(&self) -> usize {
        self.results.iter().map(|r| r.warning_count).sum()
    }

    /// Results carrying fixed output.
    pub fn fixed(&self) -> impl Iterator<Item = &LintResult> {
        self.results.iter().filter(|r| r.output.is_some())
    }
}

/// Runs the workers, merges their results and maintains the cache.
///
/// A dispatcher holds no per-run state and may be reused; each call builds a
/// fresh cursor and supervisor.
pub struct Dispatcher<A> {
    options: DispatchOptions,
    analyzer: Arc<A>,
    resolver: Arc<dyn ConfigResolver>,
}

impl<A: FileAnalyzer + 'static> Dispatcher<A> {
    /// Create a dispatcher.
    pub fn new(options: DispatchOptions, analyzer: Arc<A>, resolver: Arc<dyn ConfigResolver>) -> Self {
        Self {
            options,
            analyzer,
            resolver,
        }
    }

    /// Options this dispatcher runs with.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Expand `patterns` into tasks and lint them.
    pub fn lint_patterns<S: AsRef<str>>(&self, patterns: &[S]) -> Result<DispatchReport, LintError> {
        let tasks = TaskSetResolver::new(&self.options)?.resolve(patterns)?;
        self.lint_tasks(&tasks)
    }

    /// Lint an already ordered task list.
    ///
    /// Task indices must match their positions in `tasks`.
    pub fn lint_tasks(&self, tasks: &[Task]) -> Result<DispatchReport, LintError> {
        let start = Instant::now();

        if let Some((position, task)) = tasks.iter().enumerate().find(|(i, t)| t.index != *i) {
            return Err(LintError::InvalidConfig {
                message: format!("task at position {position} has index {}", task.index),
            });
        }

        let cache_file = resolve_cache_file(&self.options.cache_location, &self.options.cwd);
        let mut cache = if self.options.cache {
            Some(ResultCache::load(&cache_file, self.options.cache_strategy)?)
        } else {
            delete_cache_file(&cache_file)?;
            None
        };

        let worker_count = resolve_worker_count(self.options.concurrency, tasks.len());
        let output = {
            let cursor = SharedCursor::new();
            let catalog: Arc<dyn RuleCatalog> = self.analyzer.clone();
            let ctx = WorkerContext {
                tasks,
                cursor: &cursor,
                resolver: self.resolver.as_ref(),
                analyzer: self.analyzer.as_ref(),
                catalog,
                cache: cache.as_ref(),
                fix: &self.options.fix,
                warn_ignored: self.options.warn_ignored,
            };
            Supervisor::new(worker_count).run(&ctx)?
        };

        let ordered = merge_indexed(output.results, tasks.len());

        let cache_stats = match cache.as_mut() {
            Some(cache) => {
                let stats = reconcile_cache(cache, tasks, &ordered, self.resolver.as_ref())?;
                cache.save()?;
                Some(stats)
            }
            None => None,
        };

        let report = DispatchReport {
            results: ordered.into_iter().map(|merged| merged.result).collect(),
            stats: output.stats,
            worker_count,
            cache: cache_stats,
            duration: start.elapsed(),
        };

        tracing::info!(
            analyzer = self.analyzer.name(),
            files = report.results.len(),
            workers = worker_count,
            analyzed = report.stats.analyzed,
            cache_hits = report.stats.cache_hits,
            errors = report.error_count(),
            warnings = report.warning_count(),
            elapsed_ms = report.duration.as_millis() as u64,
            "dispatch complete"
        );

        Ok(report)
    }
}

/// Write fixed output back to disk for every result that has some.
///
/// Returns the number of files written.
pub fn output_fixes(results: &[LintResult]) -> Result<usize, LintError> {
    let mut written = 0;
    for result in results {
        if let Some(output) = &result.output {
            write_output(result.path(), output)?;
            written += 1;
        }
    }
    Ok(written)
}

fn write_output(path: &Path, output: &str) -> Result<(), LintError> {
    std::fs::write(path, output).map_err(|e| LintError::io(path, e))?;
    tracing::debug!(file = %path.display(), "wrote fixes");
    Ok(())
}
