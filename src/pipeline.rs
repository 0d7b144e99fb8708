// The whole analysis as one function: URLs in, combined table and
// per-URL failures out. The UI only drives this and prints the result.

use crate::api::{QueryParams, SearchAnalytics};
use crate::fetch::{fetch_url_data, FetchFailure, RetryPolicy};
use crate::table::{combine, KeywordTable};

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// `None` when no URL produced rows.
    pub table: Option<KeywordTable>,
    /// URLs that exhausted their attempts, in input order.
    pub failures: Vec<FetchFailure>,
    /// How many URLs were attempted.
    pub attempted: usize,
}

/// Events reported while the URL list is worked through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress<'a> {
    /// About to fetch `url`, the `index`-th of `total`.
    Started { index: usize, total: usize, url: &'a str },
    /// `url` ran out of attempts.
    Failed(&'a FetchFailure),
}

/// Fetch every URL in order, one at a time, and combine the results.
///
/// `on_progress` sees a `Started` event before each fetch and a `Failed`
/// event as soon as a URL gives up.
pub fn run_analysis<C, F>(
    client: &C,
    params: &QueryParams,
    urls: &[String],
    policy: &RetryPolicy,
    mut on_progress: F,
) -> AnalysisReport
where
    C: SearchAnalytics + ?Sized,
    F: FnMut(Progress<'_>),
{
    tracing::info!(urls = urls.len(), site = %params.site_url, "starting analysis");

    let mut failures = Vec::new();
    let mut responses = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        on_progress(Progress::Started {
            index: i,
            total: urls.len(),
            url,
        });
        match fetch_url_data(client, params, url, policy) {
            Ok(response) => responses.push(Some(response)),
            Err(failure) => {
                on_progress(Progress::Failed(&failure));
                failures.push(failure);
                responses.push(None);
            }
        }
    }

    let table = combine(responses);
    tracing::info!(
        rows = table.as_ref().map_or(0, KeywordTable::len),
        failed = failures.len(),
        "analysis finished"
    );
    AnalysisReport {
        table,
        failures,
        attempted: urls.len(),
    }
}
