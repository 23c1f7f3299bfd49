//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif bar per run, fed by [`ProgressMonitor`].
//! Non-TTY mode: periodic log lines (no progress bars).

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::state::RunState;

/// How often the monitor samples the shared counter
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often the monitor logs a progress line when no bar is visible
const LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Task bar style (green bar, position/total, eta)
fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<10.cyan.bold} {bar:30.green/dim} {pos:>7}/{len:7} {eta:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Context that never draws (tests, piped output).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Create the bar for a run of `total` tasks.
    ///
    /// TTY: visible bar. Non-TTY: hidden (no-op).
    pub fn task_bar(&self, name: &str, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(bar_style());
        pb.set_prefix(name.to_string());
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Polls a [`RunState`] and renders its counter against the task total.
///
/// Exits once the counter reaches the total, or once the run is marked
/// finished, so a worker that died mid-task cannot hang the monitor.
pub struct ProgressMonitor<'a> {
    state: &'a RunState,
    bar: ProgressBar,
    interval: Duration,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(state: &'a RunState, bar: ProgressBar) -> Self {
        Self {
            state,
            bar,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until done; returns the last observed counter value.
    pub fn run(self) -> usize {
        let total = self.state.total();
        let mut last_log = Instant::now();
        loop {
            // Read the flag before the counter so a finished run is never
            // reported with a stale count
            let finished = self.state.is_finished();
            let done = self.state.processed();
            self.bar.set_position(done as u64);

            if done >= total || finished {
                self.bar.finish_and_clear();
                if done < total {
                    log::warn!(
                        "Run finished with {}/{} tasks processed",
                        fmt_num(done),
                        fmt_num(total)
                    );
                }
                return done;
            }

            if self.bar.is_hidden() && last_log.elapsed() >= LOG_INTERVAL {
                log::info!("Progress: {}/{} tasks", fmt_num(done), fmt_num(total));
                last_log = Instant::now();
            }
            std::thread::sleep(self.interval);
        }
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
