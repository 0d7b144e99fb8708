use cannibal_cli::api::{ApiError, FailureKind, QueryParams, QueryRequest, QueryResponse, SearchAnalytics};
use cannibal_cli::fetch::{RetryPolicy, MAX_ATTEMPTS};
use cannibal_cli::pipeline::{run_analysis, Progress};
use cannibal_cli::spreadsheet::filter_locale_urls;
use chrono::NaiveDate;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;

/// Scripted client: each page URL maps to a fixed outcome, and every
/// call is recorded.
#[derive(Default)]
struct ScriptedClient {
    outcomes: HashMap<String, Option<QueryResponse>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedClient {
    fn ok(mut self, url: &str, body: serde_json::Value) -> Self {
        self.outcomes
            .insert(url.to_string(), Some(serde_json::from_value(body).expect("response json")));
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.outcomes.insert(url.to_string(), None);
        self
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }
}

impl SearchAnalytics for ScriptedClient {
    fn query(&self, _site_url: &str, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        let page = request.dimension_filter_groups[0].filters[0].expression.clone();
        self.calls.borrow_mut().push(page.clone());
        match self.outcomes.get(&page) {
            Some(Some(resp)) => Ok(resp.clone()),
            _ => Err(ApiError::new(FailureKind::Transient, "503 Service Unavailable - backend error")),
        }
    }
}

fn params() -> QueryParams {
    QueryParams {
        site_url: "https://site/".into(),
        start_date: NaiveDate::from_ymd_opt(2022, 10, 18).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 2, 17).unwrap(),
    }
}

fn input(urls: &[&str]) -> Vec<String> {
    filter_locale_urls(urls.iter().map(|u| u.to_string()).collect())
}

#[test]
fn locale_urls_are_never_fetched() {
    let client = ScriptedClient::default()
        .ok("https://site/a", json!({"rows": []}))
        .ok("https://site/b", json!({"rows": []}));
    let urls = input(&["https://site/a", "https://site/a?lang=fr", "https://site/b"]);
    run_analysis(&client, &params(), &urls, &RetryPolicy::default(), |_| {});
    assert_eq!(*client.calls.borrow(), vec!["https://site/a", "https://site/b"]);
}

#[test]
fn one_success_one_exhausted_failure() {
    let client = ScriptedClient::default()
        .ok("https://site/a", json!({"rows": [{"keys": ["shoe", "https://site/a"], "clicks": 5}]}))
        .failing("https://site/b");
    let urls = input(&["https://site/a", "https://site/b"]);
    let report = run_analysis(&client, &params(), &urls, &RetryPolicy::default(), |_| {});

    let table = report.table.expect("table");
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows[0].keyword, "shoe");
    assert_eq!(table.rows[0].url, "https://site/a");
    assert_eq!(table.rows[0].metrics["clicks"], json!(5));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, "https://site/b");
    assert_eq!(report.failures[0].attempts, MAX_ATTEMPTS);
    assert_eq!(client.calls_for("https://site/a"), 1);
    assert_eq!(client.calls_for("https://site/b"), MAX_ATTEMPTS as usize);
}

#[test]
fn all_failures_give_no_table_and_no_panic() {
    let client = ScriptedClient::default()
        .failing("https://site/a")
        .failing("https://site/b");
    let urls = input(&["https://site/a", "https://site/b"]);
    let report = run_analysis(&client, &params(), &urls, &RetryPolicy::default(), |_| {});
    assert!(report.table.is_none());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.attempted, 2);
}

#[test]
fn row_counts_and_order_follow_input() {
    let client = ScriptedClient::default()
        .ok(
            "https://site/b",
            json!({"rows": [
                {"keys": ["b1", "https://site/b"], "clicks": 1},
                {"keys": ["b2", "https://site/b"], "clicks": 2},
                {"keys": ["b3", "https://site/b"], "clicks": 3}
            ]}),
        )
        .ok("https://site/a", json!({"rows": [{"keys": ["a1", "https://site/a"], "clicks": 9}]}))
        .ok("https://site/c", json!({"responseAggregationType": "byPage"}));
    let urls = input(&["https://site/b", "https://site/c", "https://site/a"]);
    let report = run_analysis(&client, &params(), &urls, &RetryPolicy::default(), |_| {});

    let table = report.table.expect("table");
    let keywords: Vec<&str> = table.rows.iter().map(|r| r.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["b1", "b2", "b3", "a1"]);
    assert!(report.failures.is_empty());
}

#[test]
fn progress_reports_each_url_and_failures_as_they_happen() {
    let client = ScriptedClient::default()
        .failing("https://site/a")
        .ok("https://site/b", json!({}));
    let urls = input(&["https://site/a", "https://site/b"]);
    let mut seen = Vec::new();
    run_analysis(&client, &params(), &urls, &RetryPolicy::default(), |event| {
        seen.push(match event {
            Progress::Started { index, total, url } => format!("start {index}/{total} {url}"),
            Progress::Failed(f) => format!("failed {} after {}", f.url, f.attempts),
        });
    });
    assert_eq!(
        seen,
        vec![
            "start 0/2 https://site/a".to_string(),
            "failed https://site/a after 5".to_string(),
            "start 1/2 https://site/b".to_string(),
        ]
    );
}

#[test]
fn empty_url_list_gives_empty_report() {
    let client = ScriptedClient::default();
    let report = run_analysis(&client, &params(), &[], &RetryPolicy::default(), |_| {});
    assert!(report.table.is_none());
    assert!(report.failures.is_empty());
    assert!(client.calls.borrow().is_empty());
}
