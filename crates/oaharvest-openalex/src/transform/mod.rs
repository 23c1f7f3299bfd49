//! JSON records → tabular rows for OpenAlex authors and works

pub mod author;
pub mod work;

use serde_json::Value;

use oaharvest_core::FetchError;

/// List-valued cells are stored as compact JSON list text
pub(crate) fn encode_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
}

/// Compact, single-line JSON of the full remote record
pub(crate) fn to_backup_line(raw: &Value) -> Result<String, FetchError> {
    Ok(serde_json::to_string(raw)?)
}

// Re-exports
pub use author::{AUTHOR_COLUMNS, AuthorRecord, AuthorRow, match_authors};
pub use work::{PAPER_COLUMNS, PaperRow, WorkRecord, paper_rows};
