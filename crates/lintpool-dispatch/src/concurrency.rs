//! Worker count resolution.

use std::num::NonZeroUsize;

use lintpool_core::Concurrency;

/// Files each automatically sized worker should have to justify its thread.
pub const AUTO_FILES_PER_WORKER: usize = 35;

/// Fewest workers for which a thread pool is started.
pub const MIN_POOL_WORKERS: usize = 2;

/// Detected hardware parallelism, 1 when unknown.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Workers to use for `task_count` tasks.
///
/// Never returns more workers than tasks, and never fewer than 1.
pub fn resolve_worker_count(concurrency: Concurrency, task_count: usize) -> usize {
    let requested = match concurrency {
        Concurrency::Off => 1,
        Concurrency::Fixed(n) => n.max(1),
        Concurrency::Auto => auto_worker_count(available_parallelism(), task_count),
    };

    let count = requested.min(task_count.max(1));
    if count < requested {
        tracing::debug!(requested, task_count, "fewer tasks than requested workers");
    }
    count
}

/// Automatic sizing: half the hardware threads, bounded by the work available.
pub fn auto_worker_count(parallelism: usize, task_count: usize) -> usize {
    let by_hardware = (parallelism / 2).max(1);
    let by_tasks = task_count.div_ceil(AUTO_FILES_PER_WORKER).max(1);
    by_hardware.min(by_tasks)
}

/// Whether `worker_count` workers warrant a thread pool.
pub fn uses_pool(worker_count: usize) -> bool {
    worker_count >= MIN_POOL_WORKERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_is_single_worker() {
        assert_eq!(resolve_worker_count(Concurrency::Off, 100), 1);
        assert!(!uses_pool(1));
    }

    #[test]
    fn test_fixed_is_clamped() {
        assert_eq!(resolve_worker_count(Concurrency::Fixed(4), 100), 4);
        assert_eq!(resolve_worker_count(Concurrency::Fixed(4), 3), 3);
        assert_eq!(resolve_worker_count(Concurrency::Fixed(0), 3), 1);
        assert_eq!(resolve_worker_count(Concurrency::Fixed(4), 0), 1);
    }

    #[test]
    fn test_auto_sizing() {
        assert_eq!(auto_worker_count(16, 1000), 8);
        assert_eq!(auto_worker_count(16, 70), 2);
        assert_eq!(auto_worker_count(16, 10), 1);
        assert_eq!(auto_worker_count(1, 1000), 1);
    }

    #[test]
    fn test_auto_never_exceeds_tasks() {
        let count = resolve_worker_count(Concurrency::Auto, 2);
        assert!((1..=2).contains(&count));
    }
}
