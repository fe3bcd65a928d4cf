//! Statistics tracking for synchronization runs
//!
//! This module provides lock-free atomic statistics tracking using `SharedStats`.
//! Statistics can be safely shared across async tasks without requiring mutexes.

use crate::tree_ops::TreeOpStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Final counters of one synchronization run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// Files copied from one side to the other
    pub files_copied: u64,
    /// Directories created while copying trees
    pub directories_created: u64,
    /// Bytes of file content copied
    pub bytes_copied: u64,
    /// Files removed (or moved to trash) because the other side deleted them
    pub files_removed: u64,
    /// Conflicts detected during the walk
    pub conflicts: u64,
    /// Entries left alone because of a skipped conflict
    pub skipped: u64,
}

/// Statistics tracking with interior mutability via atomics
///
/// Atomic operations use `Ordering::Relaxed` since the counters don't
/// synchronize anything else.
///
/// ```rust
/// use filesync::stats::SharedStats;
///
/// let stats = SharedStats::new();
/// stats.increment_conflicts();
/// assert_eq!(stats.into_inner().conflicts, 1);
/// ```
#[derive(Debug, Default)]
pub struct SharedStats {
    files_copied: AtomicU64,
    directories_created: AtomicU64,
    bytes_copied: AtomicU64,
    files_removed: AtomicU64,
    conflicts: AtomicU64,
    skipped: AtomicU64,
}

impl SharedStats {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the result of a copy operation
    pub fn record_copy(&self, copied: TreeOpStats) {
        self.files_copied.fetch_add(copied.files, Ordering::Relaxed);
        self.directories_created
            .fetch_add(copied.directories, Ordering::Relaxed);
        self.bytes_copied.fetch_add(copied.bytes, Ordering::Relaxed);
    }

    /// Add the number of files a removal touched
    pub fn record_removal(&self, files: u64) {
        self.files_removed.fetch_add(files, Ordering::Relaxed);
    }

    /// Increment the conflict counter
    pub fn increment_conflicts(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the skipped counter
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters without consuming them
    #[must_use]
    pub fn snapshot(&self) -> SyncStats {
        SyncStats {
            files_copied: self.files_copied.load(Ordering::Relaxed),
            directories_created: self.directories_created.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            files_removed: self.files_removed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Convert the atomic counters into a plain `SyncStats`
    #[must_use]
    pub fn into_inner(self) -> SyncStats {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate_across_threads() {
        let stats = Arc::new(SharedStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_copy(TreeOpStats {
                            files: 1,
                            directories: 0,
                            bytes: 10,
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.files_copied, 400);
        assert_eq!(snapshot.bytes_copied, 4000);
        assert_eq!(snapshot.files_removed, 0);
    }
}
