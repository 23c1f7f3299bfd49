//! Single-writer persistence: tabular CSV rows plus raw JSON backup lines

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};

use serde::Serialize;

use crate::error::FetchError;

/// Shared error flag. `ResultWriter` sets it on failure, `ResultSink` checks it before send
pub type ErrorFlag = Arc<AtomicBool>;

/// One matched record: the extracted row and the serialized remote record
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<R> {
    pub row: R,
    pub raw: String,
}

/// Worker-side handle onto the result channel.
///
/// The channel closes once the sink (and every clone) is dropped, which is
/// the writer's only termination signal.
pub struct ResultSink<R> {
    sender: Sender<Matched<R>>,
    error_flag: ErrorFlag,
}

impl<R> Clone for ResultSink<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            error_flag: Arc::clone(&self.error_flag),
        }
    }
}

impl<R> std::fmt::Debug for ResultSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink").finish_non_exhaustive()
    }
}

impl<R> ResultSink<R> {
    pub fn new(sender: Sender<Matched<R>>, error_flag: ErrorFlag) -> Self {
        Self { sender, error_flag }
    }

    pub fn send(&self, item: Matched<R>) -> Result<(), FetchError> {
        // Fast-fail: check if the writer already errored
        if self.error_flag.load(Ordering::Relaxed) {
            return Err(FetchError::SinkClosed);
        }
        self.sender.send(item).map_err(|_| FetchError::SinkClosed)
    }
}

/// Receives matched records from workers and appends them to disk.
///
/// Sole writer of the tabular and backup files: one CSV row and one JSON
/// line per record, both flushed before the next record is taken. The two
/// appends are not atomic together.
pub struct ResultWriter<R> {
    rx: Receiver<Matched<R>>,
    table_path: PathBuf,
    backup_path: PathBuf,
    error_flag: ErrorFlag,
}

impl<R> std::fmt::Debug for ResultWriter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWriter")
            .field("table_path", &self.table_path)
            .field("backup_path", &self.backup_path)
            .finish_non_exhaustive()
    }
}

impl<R: Serialize> ResultWriter<R> {
    pub fn new(
        rx: Receiver<Matched<R>>,
        table_path: &Path,
        backup_path: &Path,
        error_flag: ErrorFlag,
    ) -> Self {
        Self {
            rx,
            table_path: table_path.to_path_buf(),
            backup_path: backup_path.to_path_buf(),
            error_flag,
        }
    }

    /// Drain the channel until every sender is gone.
    ///
    /// Returns the number of records written. On error, sets the shared
    /// `error_flag` so senders fast-fail; unconsumed records are lost.
    pub fn run(self) -> io::Result<usize> {
        let result = self.write_loop();
        if let Err(e) = &result {
            self.error_flag.store(true, Ordering::Relaxed);
            log::error!("Result writer failed: {e}");
        }
        result
    }

    fn write_loop(&self) -> io::Result<usize> {
        let mut table = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(open_append(&self.table_path)?);
        let mut backup = BufWriter::new(open_append(&self.backup_path)?);

        let mut written = 0usize;
        for item in self.rx.iter() {
            table.serialize(&item.row)?;
            table.flush()?;
            backup.write_all(item.raw.as_bytes())?;
            backup.write_all(b"\n")?;
            backup.flush()?;
            written += 1;
        }

        log::debug!(
            "Result writer done: {written} records to {}",
            self.table_path.display()
        );
        Ok(written)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
