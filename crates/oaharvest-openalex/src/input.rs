//! Candidate lists: author/institution TSV and author tables

use std::io::{self, BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashSet;

use crate::state::Task;

/// Read `author<TAB>institution` lines.
///
/// Blank lines are ignored; lines with the wrong number of fields are
/// skipped with a warning.
pub fn load_author_candidates(path: &Path) -> io::Result<Vec<(String, String)>> {
    let file = std::fs::File::open(path)?;
    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        match line.split('\t').collect::<Vec<_>>().as_slice() {
            [author, institution] if !author.trim().is_empty() => {
                out.push((author.trim().to_string(), institution.trim().to_string()));
            }
            _ => log::warn!("{}:{}: expected author<TAB>institution", path.display(), idx + 1),
        }
    }
    log::debug!("{}: {} candidates", path.display(), out.len());
    Ok(out)
}

/// Paper tasks from an author table: one per row with a non-empty
/// `works_api_url`, optionally restricted to the given author/institution
/// pairs.
pub fn load_paper_candidates(
    author_table: &Path,
    only: Option<&FxHashSet<(String, String)>>,
) -> io::Result<Vec<Task>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(author_table)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: no '{name}' column", author_table.display()),
            )
        })
    };
    let (i_leader, i_unit, i_url) = (
        position("project_leader")?,
        position("project_unit")?,
        position("works_api_url")?,
    );

    let mut tasks = Vec::new();
    let mut no_url = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("{}: skipping row {}: {e}", author_table.display(), line + 2);
                continue;
            }
        };
        let field = |i: usize| record.get(i).unwrap_or_default();
        let (leader, unit, url) = (field(i_leader), field(i_unit), field(i_url));
        if let Some(only) = only {
            if !only.contains(&(leader.to_string(), unit.to_string())) {
                continue;
            }
        }
        if url.is_empty() {
            no_url += 1;
            continue;
        }
        tasks.push(Task::paper(leader, unit, url));
    }
    if no_url > 0 {
        log::info!("{no_url} author rows have no works_api_url");
    }
    Ok(tasks)
}
