//! Run orchestration: resume, enqueue, spawn workers + writer + monitor

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use rustc_hash::FxHashSet;

use oaharvest_core::{
    ErrorFlag, Matched, ProgressMonitor, RecoveryCache, ResultSink, ResultWriter, RunState,
    SharedProgress, TaskQueue, ensure_table, fmt_num, read_key_pairs,
};

use crate::api::RecordSource;
use crate::config::Config;
use crate::names::NameResolver;
use crate::state::{Mode, OutputPaths, ResumeSet, Task, TaskPlan};
use crate::worker::{AuthorHarvest, Harvest, PaperHarvest, WorkerStats, run_worker};

/// Search authors for every `(author, institution)` candidate not already
/// in the author table, keeping affiliation matches.
pub fn run_authors<S: RecordSource>(
    config: &Config,
    candidates: Vec<(String, String)>,
    resolver: &dyn NameResolver,
    source: &S,
    progress: &SharedProgress,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();
    let mode = Mode::Authors;
    let paths = prepare(config, mode)?;

    let done = read_key_pairs(&paths.table, "project_leader", "project_unit")
        .with_context(|| format!("reading {}", paths.table.display()))?;
    let resume = ResumeSet::new(done, FxHashSet::default());

    let total = candidates.len();
    let tasks = candidates
        .iter()
        .map(|(author, institution)| AuthorHarvest::<S>::task(resolver, author, institution));
    let plan = TaskPlan::build(mode, tasks, &resume, config.max_tasks);

    let harvest = AuthorHarvest::new(source);
    execute(config, &paths, total, plan, &harvest, progress, start)
}

/// List works for every author listing URL not yet completed
pub fn run_papers<S: RecordSource>(
    config: &Config,
    candidates: Vec<Task>,
    source: &S,
    progress: &SharedProgress,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();
    let mode = Mode::Papers;
    let paths = prepare(config, mode)?;
    let cache_path = paths
        .cache
        .as_deref()
        .context("paper runs need a recovery cache path")?;

    let cached = RecoveryCache::load(cache_path)
        .with_context(|| format!("reading {}", cache_path.display()))?;
    let resume = ResumeSet::new(FxHashSet::default(), cached);

    let total = candidates.len();
    let plan = TaskPlan::build(mode, candidates, &resume, config.max_tasks);

    let cache = RecoveryCache::open(cache_path)
        .with_context(|| format!("opening {}", cache_path.display()))?;
    let harvest = PaperHarvest::new(source, &cache);
    execute(config, &paths, total, plan, &harvest, progress, start)
}

/// Output directory and table header, both before anything reads or writes
fn prepare(config: &Config, mode: Mode) -> anyhow::Result<OutputPaths> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let paths = OutputPaths::new(mode, &config.output_dir, Local::now().date_naive());
    if ensure_table(&paths.table, mode.columns())
        .with_context(|| format!("initializing {}", paths.table.display()))?
    {
        log::info!("Created {}", paths.table.display());
    }
    Ok(paths)
}

/// Marks the run finished when dropped, so the monitor exits even if the
/// worker scope unwinds.
struct FinishOnDrop<'a>(&'a RunState);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

fn execute<H: Harvest>(
    config: &Config,
    paths: &OutputPaths,
    candidates: usize,
    plan: TaskPlan,
    harvest: &H,
    progress: &SharedProgress,
    start: Instant,
) -> anyhow::Result<RunSummary> {
    let mode = harvest.mode();
    let mut summary = RunSummary::empty(mode);
    summary.candidates = candidates;
    summary.skipped = plan.skipped;
    summary.duplicates = plan.duplicates;

    let queue = TaskQueue::new(plan.tasks);
    summary.enqueued = queue.total();
    log::info!(
        "{mode}: {} candidates, {} already done, {} duplicates, {} enqueued",
        fmt_num(candidates),
        fmt_num(plan.skipped),
        fmt_num(plan.duplicates),
        fmt_num(queue.total())
    );
    if queue.is_empty() {
        log::info!("{mode}: nothing to do");
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }

    let workers = config.workers.clamp(1, queue.total());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("fetch-{i}"))
        .build()
        .context("building worker pool")?;

    let state = RunState::with_stop_flag(queue.total(), Arc::clone(&config.stop));
    let error_flag: ErrorFlag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<Matched<H::Row>>();
    let sink = ResultSink::new(tx, Arc::clone(&error_flag));

    let writer = ResultWriter::new(rx, &paths.table, &paths.backup, Arc::clone(&error_flag));
    let writer_handle = thread::Builder::new()
        .name("result-writer".into())
        .spawn(move || writer.run())
        .context("spawning result writer")?;

    log::info!("{mode}: {workers} workers, writing {}", paths.table.display());
    let stats: Mutex<Vec<WorkerStats>> = Mutex::new(Vec::with_capacity(workers));
    let bar = progress.task_bar(mode.name(), queue.total());

    thread::scope(|s| {
        let monitor = ProgressMonitor::new(&state, bar);
        s.spawn(move || monitor.run());

        let _finish = FinishOnDrop(&state);
        pool.scope(|ps| {
            for id in 0..workers {
                let sink = sink.clone();
                let (queue, state, stats) = (&queue, &state, &stats);
                ps.spawn(move |_| {
                    let s = run_worker(id, harvest, queue, &sink, state);
                    stats.lock().unwrap_or_else(PoisonError::into_inner).push(s);
                });
            }
        });
        // Every worker has returned; nothing will bump the counter again
        state.finish();
    });

    // Last sender gone: the writer drains what is queued and exits
    drop(sink);
    match writer_handle.join() {
        Ok(Ok(written)) => summary.written = written,
        Ok(Err(e)) => summary.writer_error = Some(e.to_string()),
        Err(_) => summary.writer_error = Some("result writer panicked".to_string()),
    }

    let stats = stats.into_inner().unwrap_or_else(PoisonError::into_inner);
    summary.processed = state.processed();
    summary.matched = stats.iter().map(|s| s.matched).sum();
    summary.remote_failures = stats.iter().map(|s| s.remote_failures).sum();
    summary.failed_workers = stats.iter().filter(|s| s.fatal.is_some()).count();
    summary.interrupted = state.stop_requested() || error_flag.load(Ordering::Relaxed);
    summary.elapsed = start.elapsed();

    summary.log();
    Ok(summary)
}

/// Summary of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: Mode,
    /// Candidates supplied to the run
    pub candidates: usize,
    /// Candidates completed by previous runs
    pub skipped: usize,
    pub duplicates: usize,
    pub enqueued: usize,
    /// Tasks marked processed
    pub processed: usize,
    /// Records handed to the writer
    pub matched: usize,
    /// Records the writer persisted
    pub written: usize,
    /// Tasks whose remote call failed and counted as zero results
    pub remote_failures: usize,
    /// Workers stopped by a non-transient error
    pub failed_workers: usize,
    pub writer_error: Option<String>,
    /// Stopped early (signal or writer failure)
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty(mode: Mode) -> Self {
        Self {
            mode,
            candidates: 0,
            skipped: 0,
            duplicates: 0,
            enqueued: 0,
            processed: 0,
            matched: 0,
            written: 0,
            remote_failures: 0,
            failed_workers: 0,
            writer_error: None,
            interrupted: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Every enqueued task processed and every match persisted
    pub fn is_complete(&self) -> bool {
        self.processed == self.enqueued
            && self.failed_workers == 0
            && self.writer_error.is_none()
            && self.written == self.matched
    }

    pub fn log(&self) {
        log::info!("=== {} summary ===", self.mode);
        log::info!(
            "Tasks: {}/{} processed ({} remote failures, {} skipped as done)",
            fmt_num(self.processed),
            fmt_num(self.enqueued),
            fmt_num(self.remote_failures),
            fmt_num(self.skipped)
        );
        log::info!(
            "Records: {} matched, {} written",
            fmt_num(self.matched),
            fmt_num(self.written)
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.failed_workers > 0 {
            log::warn!("{} workers stopped on errors", self.failed_workers);
        }
        if let Some(e) = &self.writer_error {
            log::error!("Result writer failed: {e}");
        }
        if self.interrupted {
            log::warn!("Run stopped early; re-run to resume");
        }
    }
}
