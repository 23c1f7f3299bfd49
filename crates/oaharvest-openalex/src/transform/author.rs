//! Author records: affiliation matching and tabular rows

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use oaharvest_core::{FetchError, Matched};

use super::{encode_list, to_backup_line};
use crate::state::Task;

/// Tabular columns for author output, in order
pub const AUTHOR_COLUMNS: [&str; 8] = [
    "project_leader",
    "project_unit",
    "openalex_id",
    "display_name",
    "institutions_ids",
    "works_api_url",
    "display_name_alternatives",
    "created_date",
];

// === Record struct (deserialized from JSON) ===

/// OpenAlex Author JSON structure (the fields we read)
#[derive(Debug, Deserialize)]
pub struct AuthorRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub display_name_alternatives: Option<Vec<String>>,

    #[serde(default)]
    pub works_api_url: Option<String>,

    #[serde(default)]
    pub created_date: Option<String>,

    #[serde(default)]
    pub affiliations: Vec<Affiliation>,
}

#[derive(Debug, Deserialize)]
pub struct Affiliation {
    #[serde(default)]
    pub institution: Option<InstitutionRef>,
}

#[derive(Debug, Deserialize)]
pub struct InstitutionRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AuthorRecord {
    /// Institution display name → institution id, over all affiliations.
    /// A repeated display name keeps the last id.
    pub fn affiliation_map(&self) -> FxHashMap<&str, Option<&str>> {
        self.affiliations
            .iter()
            .filter_map(|a| a.institution.as_ref())
            .filter_map(|i| {
                i.display_name
                    .as_deref()
                    .map(|name| (name, i.id.as_deref()))
            })
            .collect()
    }

    /// Non-empty OpenAlex id
    pub fn identity(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// A record matches iff it has an id and one of its affiliations has
    /// exactly `institution` as display name.
    pub fn matches(&self, institution: &str) -> bool {
        self.identity().is_some() && self.affiliation_map().contains_key(institution)
    }
}

// === Tabular row ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRow {
    pub project_leader: String,
    pub project_unit: String,
    pub openalex_id: String,
    pub display_name: Option<String>,
    /// Id of the matched institution
    pub institutions_ids: Option<String>,
    pub works_api_url: Option<String>,
    /// JSON list text
    pub display_name_alternatives: Option<String>,
    pub created_date: Option<String>,
}

/// Keep the candidates from an author search that match the task's
/// institution, paired with their raw JSON for backup.
///
/// A candidate that is not a JSON object is a malformed response.
pub fn match_authors(
    task: &Task,
    records: &[Value],
) -> Result<Vec<Matched<AuthorRow>>, FetchError> {
    let mut out = Vec::new();
    for raw in records {
        let record = AuthorRecord::deserialize(raw)?;
        if !record.matches(&task.institution_key) {
            continue;
        }
        let affiliations = record.affiliation_map();
        let row = AuthorRow {
            project_leader: task.local_author.clone(),
            project_unit: task.local_institution.clone(),
            openalex_id: record.identity().unwrap_or_default().to_string(),
            display_name: record.display_name.clone(),
            institutions_ids: affiliations
                .get(task.institution_key.as_str())
                .copied()
                .flatten()
                .map(String::from),
            works_api_url: record.works_api_url.clone(),
            display_name_alternatives: record
                .display_name_alternatives
                .as_deref()
                .map(encode_list),
            created_date: record.created_date.clone(),
        };
        out.push(Matched {
            row,
            raw: to_backup_line(raw)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(institution: &str) -> Task {
        Task::author("张三", "北大", "San Zhang", institution)
    }

    fn record() -> Value {
        json!({
            "id": "A1",
            "display_name": "San Zhang",
            "display_name_alternatives": ["S. Zhang", "Zhang San"],
            "works_api_url": "https://api.openalex.org/works?filter=author.id:A1",
            "created_date": "2023-07-21",
            "affiliations": [
                {"institution": {"display_name": "Peking University", "id": "I123"}, "years": [2020]},
                {"institution": {"display_name": "Tsinghua University", "id": "I456"}}
            ]
        })
    }

    #[test]
    fn matches_target_institution() {
        let r: AuthorRecord = serde_json::from_value(json!({
            "id": "A1",
            "affiliations": [{"institution": {"display_name": "X", "id": "I1"}}]
        }))
        .unwrap();
        assert!(r.matches("X"));
        assert!(!r.matches("Y"));
    }

    #[test]
    fn empty_or_missing_id_never_matches() {
        let empty: AuthorRecord = serde_json::from_value(json!({
            "id": "",
            "affiliations": [{"institution": {"display_name": "X", "id": "I1"}}]
        }))
        .unwrap();
        assert!(!empty.matches("X"));

        let missing: AuthorRecord = serde_json::from_value(json!({
            "affiliations": [{"institution": {"display_name": "X", "id": "I1"}}]
        }))
        .unwrap();
        assert!(!missing.matches("X"));
    }

    #[test]
    fn affiliation_map_skips_incomplete_entries() {
        let r: AuthorRecord = serde_json::from_value(json!({
            "id": "A1",
            "affiliations": [
                {"institution": null},
                {"institution": {"id": "I9"}},
                {"institution": {"display_name": "X", "id": "I1"}},
                {"institution": {"display_name": "X", "id": "I2"}}
            ]
        }))
        .unwrap();
        let map = r.affiliation_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("X"), Some(&Some("I2")));
    }

    #[test]
    fn match_authors_builds_row() {
        let out = match_authors(&task("Peking University"), &[record()]).unwrap();
        assert_eq!(out.len(), 1);
        let row = &out[0].row;
        assert_eq!(row.project_leader, "张三");
        assert_eq!(row.project_unit, "北大");
        assert_eq!(row.openalex_id, "A1");
        assert_eq!(row.institutions_ids.as_deref(), Some("I123"));
        assert_eq!(
            row.display_name_alternatives.as_deref(),
            Some(r#"["S. Zhang","Zhang San"]"#)
        );
        assert_eq!(row.created_date.as_deref(), Some("2023-07-21"));

        let raw: Value = serde_json::from_str(&out[0].raw).unwrap();
        assert_eq!(raw, record());
        assert!(!out[0].raw.contains('\n'));
    }

    #[test]
    fn match_authors_filters_other_institutions() {
        let other = json!({
            "id": "A2",
            "affiliations": [{"institution": {"display_name": "Fudan University", "id": "I7"}}]
        });
        let out = match_authors(&task("Peking University"), &[other, record()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row.openalex_id, "A1");

        let none = match_authors(&task("Zhejiang University"), &[record()]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn match_authors_rejects_malformed_candidate() {
        let err = match_authors(&task("X"), &[json!("not an object")]).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
