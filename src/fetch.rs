// Bounded-retry fetch of one page's rows.

use crate::api::{FailureKind, QueryParams, QueryRequest, QueryResponse, SearchAnalytics, ROW_LIMIT};
use std::fmt;

/// Attempts per URL before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryMode {
    /// Every failure is retried the same way.
    #[default]
    All,
    /// Authentication and client errors end the loop at once.
    TransientOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub mode: RetryMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            mode: RetryMode::All,
        }
    }
}

impl RetryPolicy {
    pub fn transient_only() -> Self {
        RetryPolicy {
            mode: RetryMode::TransientOnly,
            ..Self::default()
        }
    }

    fn should_retry(&self, kind: FailureKind) -> bool {
        match self.mode {
            RetryMode::All => true,
            RetryMode::TransientOnly => kind.is_transient(),
        }
    }
}

/// A URL whose data could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error fetching data for {}: {}", self.url, self.message)
    }
}

impl std::error::Error for FetchFailure {}

/// Query the rows of one page, retrying failed calls per `policy`.
///
/// Returns the first successful response, including one with no rows.
/// After the last allowed attempt the final error is returned.
pub fn fetch_url_data<C: SearchAnalytics + ?Sized>(
    client: &C,
    params: &QueryParams,
    url: &str,
    policy: &RetryPolicy,
) -> Result<QueryResponse, FetchFailure> {
    let request = QueryRequest::for_page(params, url);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        match client.query(&params.site_url, &request) {
            Ok(response) => {
                let n = response.rows.as_ref().map_or(0, Vec::len);
                if n as u32 >= ROW_LIMIT {
                    tracing::warn!(url, rows = n, "response hit the row limit; further rows are not fetched");
                }
                tracing::debug!(url, rows = n, attempts = attempts + 1, "fetched");
                return Ok(response);
            }
            Err(e) => {
                attempts += 1;
                tracing::warn!(url, attempt = attempts, kind = %e.kind, error = %e, "query failed");
                if attempts >= max_attempts || !policy.should_retry(e.kind) {
                    tracing::error!(url, attempts, error = %e, "giving up on url");
                    return Err(FetchFailure {
                        url: url.to_string(),
                        attempts,
                        kind: e.kind,
                        message: e.message,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        kind: FailureKind,
        calls: Cell<u32>,
        seen: RefCell<Vec<QueryRequest>>,
    }

    impl Flaky {
        fn new(failures: u32, kind: FailureKind) -> Self {
            Flaky {
                failures,
                kind,
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl SearchAnalytics for Flaky {
        fn query(&self, _site_url: &str, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
            self.calls.set(self.calls.get() + 1);
            self.seen.borrow_mut().push(request.clone());
            if self.calls.get() <= self.failures {
                Err(ApiError::new(self.kind, format!("boom {}", self.calls.get())))
            } else {
                Ok(QueryResponse::default())
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

    #[test]
    fn test_first_success_makes_one_call() {
        let c = Flaky::new(0, FailureKind::Transient);
        let resp = fetch_url_data(&c, &params(), "https://site/a", &RetryPolicy::default()).unwrap();
        assert!(resp.rows.is_none());
        assert_eq!(c.calls.get(), 1);
        assert_eq!(c.seen.borrow()[0].dimension_filter_groups[0].filters[0].expression, "https://site/a");
    }

    #[test]
    fn test_success_on_fifth_attempt() {
        let c = Flaky::new(4, FailureKind::Other);
        assert!(fetch_url_data(&c, &params(), "https://site/a", &RetryPolicy::default()).is_ok());
        assert_eq!(c.calls.get(), 5);
    }

    #[test]
    fn test_gives_up_after_five() {
        let c = Flaky::new(u32::MAX, FailureKind::Other);
        let err = fetch_url_data(&c, &params(), "https://site/b", &RetryPolicy::default()).unwrap_err();
        assert_eq!(c.calls.get(), 5);
        assert_eq!(err.attempts, 5);
        assert_eq!(err.message, "boom 5");
        assert_eq!(err.to_string(), "Error fetching data for https://site/b: boom 5");
    }

    #[test]
    fn test_default_mode_retries_auth_failures() {
        let c = Flaky::new(u32::MAX, FailureKind::Authentication);
        let _ = fetch_url_data(&c, &params(), "https://site/b", &RetryPolicy::default());
        assert_eq!(c.calls.get(), 5);
    }

    #[test]
    fn test_transient_only_stops_on_auth_failure() {
        let c = Flaky::new(u32::MAX, FailureKind::Authentication);
        let err = fetch_url_data(&c, &params(), "https://site/b", &RetryPolicy::transient_only()).unwrap_err();
        assert_eq!(c.calls.get(), 1);
        assert_eq!(err.kind, FailureKind::Authentication);
    }

    #[test]
    fn test_transient_only_still_retries_rate_limits() {
        let c = Flaky::new(2, FailureKind::RateLimited);
        assert!(fetch_url_data(&c, &params(), "https://site/a", &RetryPolicy::transient_only()).is_ok());
        assert_eq!(c.calls.get(), 3);
    }
}
