// API client module: a small blocking HTTP client for the Search Console
// search-analytics endpoint, behind the `SearchAnalytics` trait so the
// retry loop and pipeline can run against a scripted client in tests.

use crate::credentials::Credential;
use crate::error::Result;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Dimensions every query groups by, in key order.
pub const DIMENSIONS: [&str; 2] = ["query", "page"];

/// Rows requested per call. There is no paging past this.
pub const ROW_LIMIT: u32 = 10_000;

/// Filter restricting results to a single page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DimensionFilter {
    pub dimension: String,
    pub operator: String,
    pub expression: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilterGroup {
    pub group_type: String,
    pub filters: Vec<DimensionFilter>,
}

/// Request body for `searchAnalytics/query`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<String>,
    pub row_limit: u32,
    pub start_row: u32,
    pub dimension_filter_groups: Vec<DimensionFilterGroup>,
}

impl QueryRequest {
    /// Query for every (query, page) pair of one page URL in the window.
    pub fn for_page(params: &QueryParams, page_url: &str) -> Self {
        QueryRequest {
            start_date: params.start_date.format("%Y-%m-%d").to_string(),
            end_date: params.end_date.format("%Y-%m-%d").to_string(),
            dimensions: DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            row_limit: ROW_LIMIT,
            start_row: 0,
            dimension_filter_groups: vec![DimensionFilterGroup {
                group_type: "and".into(),
                filters: vec![DimensionFilter {
                    dimension: "page".into(),
                    operator: "equals".into(),
                    expression: page_url.to_string(),
                }],
            }],
        }
    }
}

/// The fixed part of every query: which property and which dates.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub site_url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One result row: dimension values plus whatever metrics came back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

/// Response body. The API leaves `rows` out entirely when nothing matched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ApiRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_aggregation_type: Option<String>,
}

/// Coarse classification of a failed call, used for logging and by the
/// optional transient-only retry mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    RateLimited,
    Transient,
    Other,
}

impl FailureKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => FailureKind::Authentication,
            429 => FailureKind::RateLimited,
            s if s >= 500 => FailureKind::Transient,
            _ => FailureKind::Other,
        }
    }

    /// Whether waiting and trying again could plausibly succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Transient)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Authentication => "authentication",
            FailureKind::RateLimited => "rate-limited",
            FailureKind::Transient => "transient",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

/// The single remote operation this tool needs.
pub trait SearchAnalytics {
    fn query(&self, site_url: &str, request: &QueryRequest) -> std::result::Result<QueryResponse, ApiError>;
}

/// Blocking client for the Search Console API that holds the bearer
/// token of an already loaded credential.
#[derive(Clone)]
pub struct SearchConsoleClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SearchConsoleClient {
    /// Build a client for `base_url` (e.g. `https://searchconsole.googleapis.com`).
    pub fn new(base_url: &str, credential: &Credential) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(SearchConsoleClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: credential.access_token().to_string(),
        })
    }

    /// Full endpoint URL for a property.
    pub fn query_url(&self, site_url: &str) -> String {
        format!(
            "{}/webmasters/v3/sites/{}/searchAnalytics/query",
            self.base_url,
            encode_path_segment(site_url)
        )
    }

    fn auth_headers(&self) -> std::result::Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|e| {
            ApiError::new(FailureKind::Authentication, format!("unusable access token: {e}"))
        })?;
        headers.insert(AUTHORIZATION, val);
        Ok(headers)
    }
}

impl SearchAnalytics for SearchConsoleClient {
    fn query(&self, site_url: &str, request: &QueryRequest) -> std::result::Result<QueryResponse, ApiError> {
        let url = self.query_url(site_url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(request)
            .send()
            .map_err(classify_transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let txt = res.text().unwrap_or_default();
            return Err(ApiError::new(
                FailureKind::from_status(status),
                format!("{} - {}", status, api_error_message(&txt)),
            ));
        }
        res.json::<QueryResponse>()
            .map_err(|e| ApiError::new(FailureKind::Other, format!("Parsing query response json: {e}")))
    }
}

fn classify_transport_error(err: reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
        FailureKind::Transient
    } else {
        FailureKind::Other
    };
    ApiError::new(kind, err.to_string())
}

/// Pull `error.message` out of a Google API error body, or return the
/// body unchanged.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Percent-encode everything outside the RFC 3986 unreserved set, so a
/// property such as `https://www.example.com/` fits in one path segment.
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
