//! Lock-free task queue shared by fetch workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue handing each task to exactly one worker.
///
/// The task set is fixed at construction, so [`next()`](TaskQueue::next)
/// returning `None` means the queue is permanently exhausted, not just
/// momentarily empty.
#[derive(Debug)]
pub struct TaskQueue<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> TaskQueue<T> {
    /// Create queue over the pending tasks
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next task (lock-free)
    pub fn next(&self) -> Option<&T> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }

    /// Total tasks enqueued
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Tasks not yet claimed
    pub fn remaining(&self) -> usize {
        self.total()
            .saturating_sub(self.cursor.load(Ordering::Relaxed))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
