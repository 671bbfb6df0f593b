//! Reassembly of worker batches into input order.

use lintpool_core::{FileSignature, IndexedResult, LintResult};

/// A task's result in its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResult {
    pub index: usize,
    pub result: LintResult,
    /// Signature captured when the worker read the file.
    pub signature: Option<FileSignature>,
}

/// Place results by task index, dropping tasks that produced nothing.
///
/// The returned entries are in increasing index order regardless of which
/// worker produced them or in what order the batches were concatenated.
pub fn merge_indexed(batch: Vec<IndexedResult>, task_count: usize) -> Vec<MergedResult> {
    let mut slots: Vec<Option<MergedResult>> = (0..task_count).map(|_| None).collect();

    for entry in batch {
        let Some(result) = entry.result else {
            continue;
        };
        match slots.get_mut(entry.index) {
            Some(slot) => {
                debug_assert!(slot.is_none(), "task {} produced two results", entry.index);
                *slot = Some(MergedResult {
                    index: entry.index,
                    result,
                    signature: entry.signature,
                });
            }
            None => {
                tracing::warn!(index = entry.index, task_count, "dropping result for unknown task");
            }
        }
    }

    slots.into_iter().flatten().collect()
}

/// Like [`merge_indexed`], keeping only the results.
pub fn merge_results(batch: Vec<IndexedResult>, task_count: usize) -> Vec<LintResult> {
    merge_indexed(batch, task_count)
        .into_iter()
        .map(|merged| merged.result)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> LintResult {
        LintResult::new(name, Vec::new())
    }

    #[test]
    fn test_merge_restores_order_and_drops_skips() {
        let batch = vec![
            IndexedResult::done(3, result("d")),
            IndexedResult::skipped(1),
            IndexedResult::done(0, result("a")),
            IndexedResult::done(2, result("c")),
        ];

        let merged = merge_results(batch, 4);
        let names: Vec<_> = merged.iter().map(|r| r.file_path.to_string_lossy().to_string()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_merge_indexed_keeps_indices() {
        let signature = FileSignature {
            size: 1,
            modified_ns: Some(7),
            content_hash: None,
        };
        let batch = vec![
            IndexedResult::done(4, result("e")).with_signature(Some(signature.clone())),
            IndexedResult::done(1, result("b")),
        ];
        let merged = merge_indexed(batch, 5);
        assert_eq!(merged.iter().map(|m| m.index).collect::<Vec<_>>(), vec![1, 4]);
        assert!(merged[0].signature.is_none());
        assert_eq!(merged[1].signature.as_ref(), Some(&signature));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_results(Vec::new(), 0).is_empty());
        assert!(merge_results(vec![IndexedResult::skipped(0)], 1).is_empty());
    }
}
