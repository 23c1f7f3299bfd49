//! Resume support: completion keys from previous runs

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use rustc_hash::FxHashSet;

/// Create the tabular file with its header row if it is absent or empty.
///
/// Must run before any writer starts, so the header never depends on
/// which record happens to be written first. An existing file whose last
/// row was cut short is newline-terminated so new rows start on their own
/// line. Returns `true` if created.
pub fn ensure_table(path: &Path, columns: &[&str]) -> io::Result<bool> {
    let needs_header = match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => return Err(e),
    };
    if !needs_header {
        terminate_last_line(path)?;
        return Ok(false);
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    writer.flush()?;
    log::debug!("Initialized {}", path.display());
    Ok(true)
}

/// Append `\n` to a non-empty file that does not end with one
/// (torn final write). Returns `true` if the file was repaired.
fn terminate_last_line(path: &Path) -> io::Result<bool> {
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if file.seek(SeekFrom::End(0))? == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(false);
    }
    file.write_all(b"\n")?;
    log::warn!("{}: last line was incomplete, terminated it", path.display());
    Ok(true)
}

/// Read `(col_a, col_b)` value pairs from every row of a tabular file.
///
/// A missing file yields an empty set. Rows that fail to parse (e.g. a
/// torn final line after a crash) are skipped with a warning.
pub fn read_key_pairs(
    path: &Path,
    col_a: &str,
    col_b: &str,
) -> io::Result<FxHashSet<(String, String)>> {
    let mut keys = FxHashSet::default();
    if !path.exists() {
        return Ok(keys);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: no '{name}' column", path.display()),
            )
        })
    };
    let (ia, ib) = (position(col_a)?, position(col_b)?);

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("{}: skipping row {}: {e}", path.display(), line + 2);
                continue;
            }
        };
        if let (Some(a), Some(b)) = (record.get(ia), record.get(ib)) {
            keys.insert((a.to_string(), b.to_string()));
        }
    }
    log::debug!("{}: {} completed keys", path.display(), keys.len());
    Ok(keys)
}

/// Append-only file of completed task keys, one per line.
///
/// Shared by all workers; each append is written and flushed under a lock
/// before the worker moves on, so a crash never re-runs a recorded task.
#[derive(Debug)]
pub struct RecoveryCache {
    file: Mutex<BufWriter<File>>,
}

impl RecoveryCache {
    /// Open (creating if needed) the cache for appending
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        terminate_last_line(path)?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Read every key recorded so far. A missing file yields an empty set.
    pub fn load(path: &Path) -> io::Result<FxHashSet<String>> {
        let mut keys = FxHashSet::default();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e),
        };
        for line in BufReader::new(file).lines() {
            let line = line?;
            let key = line.trim();
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        }
        log::debug!("{}: {} cached keys", path.display(), keys.len());
        Ok(keys)
    }

    /// Record one completed key (open-append-flush under the lock)
    pub fn append(&self, key: &str) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("recovery cache lock poisoned"))?;
        writeln!(file, "{key}")?;
        file.flush()
    }
}
