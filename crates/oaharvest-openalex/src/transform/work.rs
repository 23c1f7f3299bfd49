//! Work records from paper listings: tabular rows

use serde::{Deserialize, Serialize};
use serde_json::Value;

use oaharvest_core::{FetchError, Matched};

use super::{encode_list, to_backup_line};
use crate::state::Task;

/// Tabular columns for paper output, in order
pub const PAPER_COLUMNS: [&str; 10] = [
    "openalex_id",
    "title",
    "publication_date",
    "publication_year",
    "referenced_works",
    "cited_by_count",
    "cited_by_api_url",
    "author_ids",
    "project_leader",
    "project_unit",
];

// === Record struct (deserialized from JSON) ===

/// OpenAlex Work JSON structure (the fields we read)
#[derive(Debug, Deserialize)]
pub struct WorkRecord {
    /// OpenAlex ID (e.g., "https://openalex.org/W2741809807")
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Publication date (ISO 8601)
    #[serde(default)]
    pub publication_date: Option<String>,

    #[serde(default)]
    pub publication_year: Option<i32>,

    /// Ids of works this one cites
    #[serde(default)]
    pub referenced_works: Vec<String>,

    #[serde(default)]
    pub cited_by_count: Option<i64>,

    #[serde(default)]
    pub cited_by_api_url: Option<String>,

    #[serde(default)]
    pub authorships: Vec<Authorship>,
}

#[derive(Debug, Deserialize)]
pub struct Authorship {
    #[serde(default)]
    pub author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl WorkRecord {
    /// Co-author ids in authorship order, skipping anonymous entries
    pub fn author_ids(&self) -> Vec<String> {
        self.authorships
            .iter()
            .filter_map(|a| a.author.as_ref())
            .filter_map(|a| a.id.clone())
            .collect()
    }
}

// === Tabular row ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRow {
    pub openalex_id: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<String>,
    pub publication_year: Option<i32>,
    /// JSON list text
    pub referenced_works: String,
    pub cited_by_count: Option<i64>,
    pub cited_by_api_url: Option<String>,
    /// JSON list text
    pub author_ids: String,
    pub project_leader: String,
    pub project_unit: String,
}

/// Every work from a listing becomes a row; the listing URL already
/// scopes results to the task's author.
pub fn paper_rows(task: &Task, records: &[Value]) -> Result<Vec<Matched<PaperRow>>, FetchError> {
    records
        .iter()
        .map(|raw| {
            let record = WorkRecord::deserialize(raw)?;
            let row = PaperRow {
                author_ids: encode_list(&record.author_ids()),
                referenced_works: encode_list(&record.referenced_works),
                openalex_id: record.id,
                title: record.title,
                publication_date: record.publication_date,
                publication_year: record.publication_year,
                cited_by_count: record.cited_by_count,
                cited_by_api_url: record.cited_by_api_url,
                project_leader: task.local_author.clone(),
                project_unit: task.local_institution.clone(),
            };
            Ok(Matched {
                row,
                raw: to_backup_line(raw)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Task {
        Task::paper(
            "张三",
            "北大",
            "https://api.openalex.org/works?filter=author.id:A1",
        )
    }

    #[test]
    fn paper_row_fields() {
        let raw = json!({
            "id": "https://openalex.org/W1",
            "title": "Deep, wide networks",
            "publication_date": "2021-05-01",
            "publication_year": 2021,
            "referenced_works": ["https://openalex.org/W7", "https://openalex.org/W8"],
            "cited_by_count": 42,
            "cited_by_api_url": "https://api.openalex.org/works?filter=cites:W1",
            "authorships": [
                {"author": {"id": "https://openalex.org/A1"}},
                {"author": {"id": null}},
                {"author": {"id": "https://openalex.org/A2"}}
            ]
        });
        let out = paper_rows(&task(), &[raw]).unwrap();
        assert_eq!(out.len(), 1);
        let row = &out[0].row;
        assert_eq!(row.openalex_id.as_deref(), Some("https://openalex.org/W1"));
        assert_eq!(row.publication_year, Some(2021));
        assert_eq!(row.cited_by_count, Some(42));
        assert_eq!(
            row.referenced_works,
            r#"["https://openalex.org/W7","https://openalex.org/W8"]"#
        );
        assert_eq!(
            row.author_ids,
            r#"["https://openalex.org/A1","https://openalex.org/A2"]"#
        );
        assert_eq!(row.project_leader, "张三");
        assert_eq!(row.project_unit, "北大");
    }

    #[test]
    fn every_record_is_emitted() {
        let records = vec![json!({"id": "W1"}), json!({}), json!({"id": "W3"})];
        let out = paper_rows(&task(), &records).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].row.openalex_id, None);
        assert_eq!(out[1].row.referenced_works, "[]");
    }

    #[test]
    fn malformed_record_is_error() {
        let err = paper_rows(&task(), &[json!([1, 2, 3])]).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
