//! Fetch workers: query OpenAlex per task, filter, hand matches to the writer

use serde::Serialize;
use serde_json::Value;

use oaharvest_core::{FetchError, Matched, RecoveryCache, ResultSink, RunState, TaskQueue};

use crate::api::RecordSource;
use crate::names::NameResolver;
use crate::state::{Mode, Task};
use crate::transform::{AuthorRow, PaperRow, match_authors, paper_rows};

/// Per-mode behavior of a fetch worker
pub trait Harvest: Sync {
    type Row: Serialize + Send + 'static;

    fn mode(&self) -> Mode;

    /// Issue the remote query for one task
    fn fetch(&self, task: &Task) -> Result<Vec<Value>, FetchError>;

    /// Turn returned records into rows to persist
    fn select(&self, task: &Task, records: &[Value]) -> Result<Vec<Matched<Self::Row>>, FetchError>;

    /// Runs after the task's matches were handed off, before the next task
    fn complete(&self, _task: &Task) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Author search by name, kept only when the affiliation matches
pub struct AuthorHarvest<'a, S> {
    source: &'a S,
}

impl<'a, S: RecordSource> AuthorHarvest<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Build the task for one `(author, institution)` candidate
    pub fn task(resolver: &dyn NameResolver, author: &str, institution: &str) -> Task {
        Task::author(
            author,
            institution,
            resolver.resolve_author(author),
            resolver.resolve_institution(institution),
        )
    }
}

impl<S: RecordSource> Harvest for AuthorHarvest<'_, S> {
    type Row = AuthorRow;

    fn mode(&self) -> Mode {
        Mode::Authors
    }

    fn fetch(&self, task: &Task) -> Result<Vec<Value>, FetchError> {
        self.source.search_authors(&task.query_key)
    }

    fn select(&self, task: &Task, records: &[Value]) -> Result<Vec<Matched<AuthorRow>>, FetchError> {
        match_authors(task, records)
    }
}

/// Paper listing per author; every work is kept and the listing URL is
/// recorded in the recovery cache once the task is done
pub struct PaperHarvest<'a, S> {
    source: &'a S,
    cache: &'a RecoveryCache,
}

impl<'a, S: RecordSource> PaperHarvest<'a, S> {
    pub fn new(source: &'a S, cache: &'a RecoveryCache) -> Self {
        Self { source, cache }
    }
}

impl<S: RecordSource> Harvest for PaperHarvest<'_, S> {
    type Row = PaperRow;

    fn mode(&self) -> Mode {
        Mode::Papers
    }

    fn fetch(&self, task: &Task) -> Result<Vec<Value>, FetchError> {
        self.source.list_works(&task.query_key)
    }

    fn select(&self, task: &Task, records: &[Value]) -> Result<Vec<Matched<PaperRow>>, FetchError> {
        paper_rows(task, records)
    }

    fn complete(&self, task: &Task) -> Result<(), FetchError> {
        self.cache.append(&task.query_key)?;
        Ok(())
    }
}

/// Result of one processed task
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub matched: usize,
    /// Remote call failed transiently and was treated as zero results
    pub remote_failed: bool,
}

/// Process one task: fetch, select, hand off, complete.
///
/// Transient remote failures become an empty result set; any other error
/// is returned and the task is left unrecorded.
pub fn process_task<H: Harvest>(
    harvest: &H,
    task: &Task,
    sink: &ResultSink<H::Row>,
) -> Result<TaskOutcome, FetchError> {
    let mut outcome = TaskOutcome::default();

    let records = match harvest.fetch(task) {
        Ok(records) => records,
        Err(e) if e.is_transient() => {
            log::warn!("{}: {e}, treating as no results", task.label());
            outcome.remote_failed = true;
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let matches = harvest.select(task, &records)?;
    outcome.matched = matches.len();
    for item in matches {
        sink.send(item)?;
    }

    harvest.complete(task)?;
    log::debug!(
        "{}: {} of {} records kept",
        task.label(),
        outcome.matched,
        records.len()
    );
    Ok(outcome)
}

/// Statistics from one worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub tasks: usize,
    pub matched: usize,
    pub remote_failures: usize,
    /// Error that stopped this worker early
    pub fatal: Option<String>,
}

/// Claim and process tasks until the queue is exhausted, a stop is
/// requested, or a non-transient error occurs.
///
/// Every processed task bumps the shared counter exactly once; a task
/// that hits a fatal error is not counted.
pub fn run_worker<H: Harvest>(
    worker_id: usize,
    harvest: &H,
    queue: &TaskQueue<Task>,
    sink: &ResultSink<H::Row>,
    state: &RunState,
) -> WorkerStats {
    let mut stats = WorkerStats {
        worker_id,
        ..Default::default()
    };

    loop {
        if state.stop_requested() {
            log::debug!("worker {worker_id}: stop requested");
            break;
        }
        let Some(task) = queue.next() else {
            break;
        };

        match process_task(harvest, task, sink) {
            Ok(outcome) => {
                stats.tasks += 1;
                stats.matched += outcome.matched;
                stats.remote_failures += usize::from(outcome.remote_failed);
                state.task_done();
            }
            Err(e) => {
                log::error!(
                    "worker {worker_id}: {} ({}): {e}; worker stopping",
                    task.label(),
                    harvest.mode()
                );
                stats.fatal = Some(e.to_string());
                break;
            }
        }
    }
    stats
}
