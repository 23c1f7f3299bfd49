//! End-to-end runs against canned OpenAlex responses

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use tempfile::TempDir;

use oaharvest_core::{FetchError, ProgressContext, SharedProgress};
use oaharvest_openalex::{
    Config, RecordSource, TableResolver, Task, load_paper_candidates, run_authors, run_papers,
};

/// Answers by query key; unknown keys return an empty result list
#[derive(Default)]
struct StubSource {
    answers: HashMap<String, Result<Vec<Value>, u16>>,
    malformed: HashSet<String>,
    calls: AtomicUsize,
}

impl StubSource {
    fn with(mut self, key: &str, answer: Result<Vec<Value>, u16>) -> Self {
        self.answers.insert(key.to_string(), answer);
        self
    }

    /// Answer `key` with a body that has no usable `results`
    fn malformed(mut self, key: &str) -> Self {
        self.malformed.insert(key.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, key: &str) -> Result<Vec<Value>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.malformed.contains(key) {
            return Err(FetchError::Decode("no 'results' in response".into()));
        }
        match self.answers.get(key) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(status)) => Err(FetchError::Http {
                status: Some(*status),
                message: "stub".into(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

impl RecordSource for StubSource {
    fn search_authors(&self, name: &str) -> Result<Vec<Value>, FetchError> {
        self.answer(name)
    }

    fn list_works(&self, url: &str) -> Result<Vec<Value>, FetchError> {
        self.answer(url)
    }
}

fn config(dir: &Path, workers: usize) -> Config {
    Config {
        output_dir: dir.to_path_buf(),
        workers,
        ..Default::default()
    }
}

fn progress() -> SharedProgress {
    Arc::new(ProgressContext::hidden())
}

fn resolver() -> TableResolver {
    TableResolver::from_pairs([("北大", "Peking University"), ("清华", "Tsinghua University")])
}

fn pair(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn author(id: &str, institution: &str, institution_id: &str) -> Value {
    json!({
        "id": id,
        "display_name": "San Zhang",
        "display_name_alternatives": ["S. Zhang"],
        "works_api_url": format!("https://api.openalex.org/works?filter=author.id:{id}"),
        "created_date": "2023-07-21",
        "affiliations": [{"institution": {"display_name": institution, "id": institution_id}}]
    })
}

fn work(id: &str) -> Value {
    json!({
        "id": id,
        "title": "A study",
        "publication_date": "2021-05-01",
        "publication_year": 2021,
        "referenced_works": ["W9"],
        "cited_by_count": 3,
        "cited_by_api_url": format!("https://api.openalex.org/works?filter=cites:{id}"),
        "authorships": [{"author": {"id": "A1"}}, {"author": {"id": "A7"}}]
    })
}

/// Data rows of a CSV file as column → value maps
fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            headers
                .iter()
                .zip(r.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn backup_file(dir: &Path, prefix: &str) -> PathBuf {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .unwrap()
}

#[test]
fn author_run_end_to_end() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default().with(
        "San Zhang",
        Ok(vec![
            author("A1", "Peking University", "I123"),
            author("A2", "Tsinghua University", "I456"),
        ]),
    );

    let summary = run_authors(
        &config(dir.path(), 2),
        vec![pair("张三", "北大")],
        &resolver(),
        &source,
        &progress(),
    )
    .unwrap();
    assert_eq!(summary.enqueued, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.written, 1);
    assert!(summary.is_complete());

    let rows = read_rows(&dir.path().join("author_db.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["project_leader"], "张三");
    assert_eq!(rows[0]["project_unit"], "北大");
    assert_eq!(rows[0]["openalex_id"], "A1");
    assert_eq!(rows[0]["institutions_ids"], "I123");

    let backup = fs::read_to_string(backup_file(dir.path(), "author_info_")).unwrap();
    let lines: Vec<&str> = backup.lines().collect();
    assert_eq!(lines.len(), 1);
    let raw: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(raw["id"], "A1");
}

#[test]
fn author_rerun_enqueues_nothing() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default()
        .with("San Zhang", Ok(vec![author("A1", "Peking University", "I123")]))
        .with("Si Li", Ok(vec![author("A3", "Tsinghua University", "I456")]));
    let candidates = vec![pair("张三", "北大"), pair("李四", "清华")];

    let first = run_authors(&config(dir.path(), 2), candidates.clone(), &resolver(), &source, &progress())
        .unwrap();
    assert_eq!(first.enqueued, 2);
    assert_eq!(source.calls(), 2);

    let second = run_authors(&config(dir.path(), 2), candidates, &resolver(), &source, &progress())
        .unwrap();
    assert_eq!(second.enqueued, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(source.calls(), 2);
    assert_eq!(read_rows(&dir.path().join("author_db.csv")).len(), 2);
}

#[test]
fn author_remote_failure_counts_as_processed() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default()
        .with("San Zhang", Err(500))
        .with("Si Li", Ok(vec![author("A3", "Tsinghua University", "I456")]));

    let summary = run_authors(
        &config(dir.path(), 2),
        vec![pair("张三", "北大"), pair("李四", "清华")],
        &resolver(),
        &source,
        &progress(),
    )
    .unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.remote_failures, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed_workers, 0);

    let rows = read_rows(&dir.path().join("author_db.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["project_leader"], "李四");
}

#[test]
fn author_zero_match_is_requeried() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default();
    let candidates = vec![pair("张三", "北大")];

    run_authors(&config(dir.path(), 1), candidates.clone(), &resolver(), &source, &progress()).unwrap();
    let again =
        run_authors(&config(dir.path(), 1), candidates, &resolver(), &source, &progress()).unwrap();
    assert_eq!(again.enqueued, 1);
    assert_eq!(source.calls(), 2);
}

#[test]
fn counter_matches_enqueued_for_any_worker_count() {
    for workers in [1, 2, 4] {
        let dir = TempDir::new().unwrap();
        let candidates: Vec<(String, String)> =
            (0..20).map(|i| pair(&format!("author{i}"), "北大")).collect();
        let mut source = StubSource::default();
        for i in (0..20).step_by(3) {
            source = source.with(
                &format!("author{i}"),
                Ok(vec![author(&format!("A{i}"), "Peking University", "I123")]),
            );
        }

        let summary = run_authors(
            &config(dir.path(), workers),
            candidates,
            &resolver(),
            &source,
            &progress(),
        )
        .unwrap();
        assert_eq!(summary.enqueued, 20, "workers={workers}");
        assert_eq!(summary.processed, 20, "workers={workers}");
        assert_eq!(source.calls(), 20, "workers={workers}");
        assert_eq!(summary.written, 7, "workers={workers}");
        assert_eq!(read_rows(&dir.path().join("author_db.csv")).len(), 7);
    }
}

#[test]
fn paper_run_records_cache_and_resumes() {
    let dir = TempDir::new().unwrap();
    let url1 = "https://api.openalex.org/works?filter=author.id:A1";
    let url2 = "https://api.openalex.org/works?filter=author.id:A2";
    let url3 = "https://api.openalex.org/works?filter=author.id:A3";
    let source = StubSource::default()
        .with(url1, Ok(vec![work("W1"), work("W2")]))
        .with(url2, Err(503));

    // A previous run already finished url3
    fs::write(dir.path().join("paper_done.txt"), format!("{url3}\n")).unwrap();

    let candidates = vec![
        Task::paper("张三", "北大", url1),
        Task::paper("李四", "清华", url2),
        Task::paper("王五", "复旦", url3),
    ];
    let summary = run_papers(&config(dir.path(), 2), candidates.clone(), &source, &progress()).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(source.calls(), 2);

    let rows = read_rows(&dir.path().join("paper_db.csv"));
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["project_leader"] == "张三"));
    assert_eq!(rows[0]["author_ids"], r#"["A1","A7"]"#);

    // Transient failure is still recorded as done
    let cache = fs::read_to_string(dir.path().join("paper_done.txt")).unwrap();
    for url in [url1, url2, url3] {
        assert!(cache.lines().any(|l| l == url), "{url} not cached");
    }

    let again = run_papers(&config(dir.path(), 2), candidates, &source, &progress()).unwrap();
    assert_eq!(again.enqueued, 0);
    assert_eq!(source.calls(), 2);
}

#[test]
fn paper_candidates_from_author_run() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default().with(
        "San Zhang",
        Ok(vec![author("A1", "Peking University", "I123")]),
    );
    run_authors(&config(dir.path(), 1), vec![pair("张三", "北大")], &resolver(), &source, &progress())
        .unwrap();

    let tasks = load_paper_candidates(&dir.path().join("author_db.csv"), None).unwrap();
    assert_eq!(
        tasks,
        vec![Task::paper(
            "张三",
            "北大",
            "https://api.openalex.org/works?filter=author.id:A1"
        )]
    );
}

#[test]
fn stop_before_start_processes_nothing() {
    let dir = TempDir::new().unwrap();
    let source = StubSource::default();
    let config = config(dir.path(), 2);
    config.stop.store(true, Ordering::SeqCst);

    let summary = run_authors(&config, vec![pair("张三", "北大")], &resolver(), &source, &progress())
        .unwrap();
    assert_eq!(summary.enqueued, 1);
    assert_eq!(summary.processed, 0);
    assert!(summary.interrupted);
    assert_eq!(source.calls(), 0);
}

#[test]
fn paper_resume_is_per_listing_url() {
    let dir = TempDir::new().unwrap();
    let url_a = "https://api.openalex.org/works?filter=author.id:A1";
    let url_b = "https://api.openalex.org/works?filter=author.id:A9";
    let source = StubSource::default()
        .with(url_a, Ok(vec![work("W1")]))
        .with(url_b, Ok(vec![work("W2")]));
    // One local pair matched two OpenAlex authors
    let candidates = vec![
        Task::paper("张三", "北大", url_a),
        Task::paper("张三", "北大", url_b),
    ];

    let mut limited = config(dir.path(), 1);
    limited.max_tasks = Some(1);
    let first = run_papers(&limited, candidates.clone(), &source, &progress()).unwrap();
    assert_eq!(first.enqueued, 1);
    assert_eq!(source.calls(), 1);

    let second = run_papers(&config(dir.path(), 2), candidates, &source, &progress()).unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.enqueued, 1);
    assert_eq!(second.written, 1);
    assert_eq!(source.calls(), 2);

    let ids: HashSet<String> = read_rows(&dir.path().join("paper_db.csv"))
        .into_iter()
        .map(|r| r["openalex_id"].clone())
        .collect();
    assert_eq!(ids, HashSet::from(["W1".to_string(), "W2".to_string()]));
}

#[test]
fn malformed_response_stops_only_its_worker() {
    let dir = TempDir::new().unwrap();
    let urls: Vec<String> = (1..=6)
        .map(|i| format!("https://api.openalex.org/works?filter=author.id:A{i}"))
        .collect();
    let bad = urls[2].as_str();
    let mut source = StubSource::default().malformed(bad);
    for (i, url) in urls.iter().enumerate() {
        if url != bad {
            source = source.with(url, Ok(vec![work(&format!("W{i}"))]));
        }
    }
    let candidates: Vec<Task> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| Task::paper(format!("author{i}"), "北大", url.as_str()))
        .collect();

    let summary = run_papers(&config(dir.path(), 2), candidates, &source, &progress()).unwrap();
    assert_eq!(summary.enqueued, 6);
    assert_eq!(summary.failed_workers, 1);
    assert_eq!(summary.processed, summary.enqueued - 1);
    assert_eq!(summary.written, 5);
    assert!(!summary.is_complete());

    let rows = read_rows(&dir.path().join("paper_db.csv"));
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r["project_leader"] != "author2"));

    let cache = fs::read_to_string(dir.path().join("paper_done.txt")).unwrap();
    assert_eq!(cache.lines().count(), 5);
    assert!(!cache.lines().any(|l| l == bad));

    // The held task is picked up again on the next run
    let retry_source = StubSource::default().with(bad, Ok(vec![work("W2")]));
    let candidates: Vec<Task> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| Task::paper(format!("author{i}"), "北大", url.as_str()))
        .collect();
    let again = run_papers(&config(dir.path(), 2), candidates, &retry_source, &progress()).unwrap();
    assert_eq!(again.enqueued, 1);
    assert!(again.is_complete());
    assert_eq!(retry_source.calls(), 1);
}
