//! Shared task cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out task indices to workers.
///
/// Every claim is a single `fetch_add`, so each value is observed by exactly
/// one caller and the sequence never decreases. A claimed value at or past
/// the task count means there is no work left.
#[derive(Debug, Default)]
pub struct SharedCursor {
    next: AtomicUsize,
}

impl SharedCursor {
    /// Create a cursor starting at 0.
    pub fn new() -> Self {
        Self {
            next: AtomicUsize::new(0),
        }
    }

    /// Claim the next unclaimed index.
    #[inline]
    pub fn claim_next(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Force the cursor past the last task so every worker stops claiming.
    ///
    /// Never moves the cursor backwards.
    pub fn exhaust(&self, task_count: usize) {
        self.next.fetch_max(task_count, Ordering::Relaxed);
    }

    /// Check whether no tasks remain to be claimed.
    pub fn is_exhausted(&self, task_count: usize) -> bool {
        self.next.load(Ordering::Relaxed) >= task_count
    }

    /// Current cursor value.
    pub fn position(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_claims_are_sequential() {
        let cursor = SharedCursor::new();
        assert_eq!(cursor.claim_next(), 0);
        assert_eq!(cursor.claim_next(), 1);
        assert_eq!(cursor.claim_next(), 2);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_concurrent_claims_are_unique() {
        let cursor = SharedCursor::new();
        let per_thread = 1000;
        let threads = 8;

        let claimed: Vec<Vec<usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| s.spawn(|| (0..per_thread).map(|_| cursor.claim_next()).collect()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all: HashSet<usize> = claimed.iter().flatten().copied().collect();
        assert_eq!(all.len(), per_thread * threads);
        assert_eq!(all, (0..per_thread * threads).collect());
    }

    #[test]
    fn test_exhaust_is_monotonic() {
        let cursor = SharedCursor::new();
        cursor.claim_next();
        cursor.exhaust(10);
        assert!(cursor.is_exhausted(10));
        assert!(cursor.claim_next() >= 10);

        cursor.exhaust(3);
        assert!(cursor.position() > 10);
    }
}
