//! Parallel lint dispatch for lintpool.
//!
//! This crate fans an ordered list of files out over a fixed pool of
//! workers and brings the results back in input order.
//!
//! # Overview
//!
//! - **Shared cursor**: a single atomic counter hands out task indices, so
//!   every task is claimed exactly once without locks
//! - **Fail fast**: the first worker error exhausts the cursor and is
//!   returned unchanged, with partial results discarded
//! - **Deterministic output**: results are merged by task index whatever the
//!   worker count
//! - **Caching**: unchanged files with an unchanged configuration are
//!   answered from the result cache
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lintpool_core::{
//!     AnalyzeRequest, Concurrency, DispatchOptions, FileAnalyzer, LintConfig, LintError,
//!     LintResult, RuleCatalog, SingleConfig,
//! };
//! use lintpool_dispatch::Dispatcher;
//!
//! struct Noop;
//! impl RuleCatalog for Noop {}
//! impl FileAnalyzer for Noop {
//!     fn name(&self) -> &'static str { "noop" }
//!     fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<LintResult, LintError> {
//!         Ok(LintResult::new(request.path, Vec::new()))
//!     }
//! }
//!
//! let options = DispatchOptions::builder()
//!     .cwd("/path/to/project")
//!     .concurrency(Concurrency::Auto)
//!     .build()
//!     .unwrap();
//! let resolver = Arc::new(SingleConfig::new(LintConfig::default()).unwrap());
//! let dispatcher = Dispatcher::new(options, Arc::new(Noop), resolver);
//! let report = dispatcher.lint_patterns(&["."]).unwrap();
//!
//! println!("{} files, {} errors", report.results.len(), report.error_count());
//! ```

mod concurrency;
mod cursor;
mod dispatcher;
mod merge;
mod pool;
mod reconcile;
mod resolve;
mod worker;

pub use concurrency::{
    AUTO_FILES_PER_WORKER, MIN_POOL_WORKERS, auto_worker_count, available_parallelism,
    resolve_worker_count, uses_pool,
};
pub use cursor::SharedCursor;
pub use dispatcher::{DispatchReport, Dispatcher, output_fixes};
pub use merge::{MergedResult, merge_indexed, merge_results};
pub use pool::{PoolOutput, PoolState, Supervisor};
pub use reconcile::{ReconcileStats, reconcile_cache};
pub use resolve::TaskSetResolver;
pub use worker::{Worker, WorkerContext, WorkerReport, WorkerStats};

// Re-export core types for convenience
pub use lintpool_core::{DispatchOptions, IndexedResult, LintError, LintResult, Task};
