//! Shared run state: progress counter, completion flag, stop flag

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::shutdown::{StopFlag, is_stop_requested, stop_flag};

/// Per-run shared state, passed by reference into every worker, the
/// writer and the progress monitor.
#[derive(Debug)]
pub struct RunState {
    total: usize,
    processed: AtomicUsize,
    finished: AtomicBool,
    stop: StopFlag,
}

impl RunState {
    /// New state for a run of `total` enqueued tasks
    pub fn new(total: usize) -> Self {
        Self::with_stop_flag(total, stop_flag())
    }

    /// New state observing an externally owned stop flag (signal handlers)
    pub fn with_stop_flag(total: usize, stop: StopFlag) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            stop,
        }
    }

    /// Number of tasks enqueued for this run
    pub fn total(&self) -> usize {
        self.total
    }

    /// Record one processed task; returns the new count
    pub fn task_done(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Tasks processed so far
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Signal that no further tasks will ever be processed.
    ///
    /// Returns `true` only for the call that actually set the flag.
    pub fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::AcqRel)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether a graceful stop was requested
    pub fn stop_requested(&self) -> bool {
        is_stop_requested(&self.stop)
    }

    /// Ask workers to stop after their current task
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
