//! Pipeline state types: fetch mode, tasks, completion keys

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::transform::{AUTHOR_COLUMNS, PAPER_COLUMNS};

/// What a run fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Author search by transliterated name, filtered by institution
    Authors,
    /// Paper listings per author, unfiltered
    Papers,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authors => "authors",
            Self::Papers => "papers",
        }
    }

    /// Tabular output columns, in order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Authors => &AUTHOR_COLUMNS,
            Self::Papers => &PAPER_COLUMNS,
        }
    }

    fn file_stem(&self) -> &'static str {
        match self {
            Self::Authors => "author",
            Self::Papers => "paper",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Files a run reads and appends to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Tabular file (`{stem}_db.csv`), header written before workers start
    pub table: PathBuf,
    /// Raw JSON backup, one record per line, one file per day
    pub backup: PathBuf,
    /// Completed listing URLs (papers only)
    pub cache: Option<PathBuf>,
}

impl OutputPaths {
    pub fn new(mode: Mode, output_dir: &Path, date: NaiveDate) -> Self {
        let stem = mode.file_stem();
        Self {
            table: output_dir.join(format!("{stem}_db.csv")),
            backup: output_dir.join(format!("{stem}_info_{}.txt", date.format("%Y-%m-%d"))),
            cache: match mode {
                Mode::Authors => None,
                Mode::Papers => Some(output_dir.join("paper_done.txt")),
            },
        }
    }
}

/// One unit of fetch work. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Author name as given locally
    pub local_author: String,
    /// Institution name as given locally
    pub local_institution: String,
    /// Transliterated author name (authors) or listing URL (papers)
    pub query_key: String,
    /// Institution display name to match against (authors only)
    pub institution_key: String,
}

impl Task {
    pub fn author(
        local_author: impl Into<String>,
        local_institution: impl Into<String>,
        query_name: impl Into<String>,
        institution_key: impl Into<String>,
    ) -> Self {
        Self {
            local_author: local_author.into(),
            local_institution: local_institution.into(),
            query_key: query_name.into(),
            institution_key: institution_key.into(),
        }
    }

    pub fn paper(
        local_author: impl Into<String>,
        local_institution: impl Into<String>,
        listing_url: impl Into<String>,
    ) -> Self {
        Self {
            local_author: local_author.into(),
            local_institution: local_institution.into(),
            query_key: listing_url.into(),
            institution_key: String::new(),
        }
    }

    /// Identity used to decide "already done"
    pub fn completion_key(&self, mode: Mode) -> CompletionKey {
        match mode {
            Mode::Authors => {
                CompletionKey::Pair(self.local_author.clone(), self.local_institution.clone())
            }
            Mode::Papers => CompletionKey::Url(self.query_key.clone()),
        }
    }

    /// Short label for logs
    pub fn label(&self) -> String {
        format!("{}/{}", self.local_author, self.local_institution)
    }
}

/// Identity of a completed task
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompletionKey {
    /// `(local_author, local_institution)`
    Pair(String, String),
    /// Listing URL
    Url(String),
}

/// Keys completed by previous runs
#[derive(Debug, Default)]
pub struct ResumeSet {
    pairs: FxHashSet<(String, String)>,
    urls: FxHashSet<String>,
}

impl ResumeSet {
    pub fn new(pairs: FxHashSet<(String, String)>, urls: FxHashSet<String>) -> Self {
        Self { pairs, urls }
    }

    /// Whether the task's completion key was recorded before: its
    /// author/institution pair (authors) or its listing URL (papers).
    ///
    /// One pair can own several listing URLs, so paper tasks are never
    /// judged by pair.
    pub fn is_done(&self, mode: Mode, task: &Task) -> bool {
        match mode {
            Mode::Authors => self
                .pairs
                .contains(&(task.local_author.clone(), task.local_institution.clone())),
            Mode::Papers => self.urls.contains(&task.query_key),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.urls.is_empty()
    }
}

/// Tasks to enqueue for one run
#[derive(Debug, Default)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    /// Candidates already completed in previous runs
    pub skipped: usize,
    /// Candidates repeating an earlier candidate's key
    pub duplicates: usize,
}

impl TaskPlan {
    /// `candidates − resume`, first occurrence per completion key,
    /// optionally capped at `limit` tasks.
    pub fn build(
        mode: Mode,
        candidates: impl IntoIterator<Item = Task>,
        resume: &ResumeSet,
        limit: Option<usize>,
    ) -> Self {
        let mut plan = Self::default();
        let mut seen = FxHashSet::default();
        for task in candidates {
            if !seen.insert(task.completion_key(mode)) {
                plan.duplicates += 1;
                continue;
            }
            if resume.is_done(mode, &task) {
                plan.skipped += 1;
                continue;
            }
            plan.tasks.push(task);
        }
        if let Some(max) = limit {
            plan.tasks.truncate(max);
        }
        plan
    }
}
