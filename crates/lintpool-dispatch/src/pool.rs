//! Worker pool supervision.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use lintpool_core::{IndexedResult, LintError};

use crate::concurrency::uses_pool;
use crate::worker::{Worker, WorkerContext, WorkerReport, WorkerStats};

/// Lifecycle of a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Idle,
            1 => PoolState::Running,
            2 => PoolState::Completed,
            _ => PoolState::Failed,
        }
    }
}

/// Concatenated output of all workers.
#[derive(Debug, Default)]
pub struct PoolOutput {
    /// Indexed results from every worker, in no particular order.
    pub results: Vec<IndexedResult>,
    /// Summed worker counters.
    pub stats: WorkerStats,
}

impl PoolOutput {
    fn from_reports(reports: impl IntoIterator<Item = WorkerReport>) -> Self {
        let mut output = PoolOutput::default();
        for report in reports {
            output.stats.absorb(&report.stats);
            output.results.extend(report.batch);
        }
        output
    }
}

/// Runs a fixed number of workers over one task list.
///
/// The first worker error is fatal: the cursor is exhausted so the other
/// workers stop after their current file, and that error is returned with
/// every partial result discarded. A supervisor runs at most once.
#[derive(Debug)]
pub struct Supervisor {
    worker_count: usize,
    state: AtomicU8,
}

impl Supervisor {
    /// Create a supervisor for `worker_count` workers (at least 1).
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            state: AtomicU8::new(PoolState::Idle as u8),
        }
    }

    /// Number of workers this supervisor starts.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Run the workers to completion or first failure.
    ///
    /// A single worker runs inline on the calling thread; otherwise each
    /// worker gets its own thread in a dedicated pool.
    pub fn run(&self, ctx: &WorkerContext<'_>) -> Result<PoolOutput, LintError> {
        self.state
            .compare_exchange(
                PoolState::Idle as u8,
                PoolState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| LintError::PoolStart {
                message: "supervisor has already run".to_string(),
            })?;

        tracing::debug!(workers = self.worker_count, tasks = ctx.task_count(), "starting workers");

        if !uses_pool(self.worker_count) {
            return match run_guarded(Worker::new(0), ctx) {
                Ok(report) => {
                    self.finish(PoolState::Completed);
                    Ok(PoolOutput::from_reports([report]))
                }
                Err(error) => {
                    self.fail(ctx);
                    Err(error)
                }
            };
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .thread_name(|i| format!("lintpool-worker-{i}"))
            .build()
            .map_err(|e| {
                self.finish(PoolState::Failed);
                LintError::PoolStart {
                    message: e.to_string(),
                }
            })?;

        let first_error: OnceLock<LintError> = OnceLock::new();
        let reports: Vec<Option<WorkerReport>> = pool.broadcast(|broadcast| {
            match run_guarded(Worker::new(broadcast.index()), ctx) {
                Ok(report) => Some(report),
                Err(error) => {
                    self.fail(ctx);
                    if let Err(later) = first_error.set(error) {
                        tracing::debug!(worker = broadcast.index(), error = %later, "dropping later worker error");
                    }
                    None
                }
            }
        });

        if let Some(error) = first_error.into_inner() {
            return Err(error);
        }

        self.finish(PoolState::Completed);
        Ok(PoolOutput::from_reports(reports.into_iter().flatten()))
    }

    /// Enter `Failed` and stop further claims.
    fn fail(&self, ctx: &WorkerContext<'_>) {
        self.finish(PoolState::Failed);
        ctx.cursor.exhaust(ctx.task_count());
    }

    fn finish(&self, state: PoolState) {
        // `Failed` is terminal.
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != PoolState::Failed as u8).then_some(state as u8)
            });
    }
}

/// Run a worker, converting a panic into a worker-fatal error.
fn run_guarded(worker: Worker, ctx: &WorkerContext<'_>) -> Result<WorkerReport, LintError> {
    match panic::catch_unwind(AssertUnwindSafe(|| worker.run(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(LintError::WorkerPanicked {
            worker: worker.id(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
