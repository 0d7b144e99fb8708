// URL source: the `URL` column of an uploaded workbook, minus
// locale-variant pages.

use crate::error::{AppError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

/// Header the URL column must carry, matched exactly.
pub const URL_HEADER: &str = "URL";

/// Pages whose URL contains this are skipped.
const LOCALE_MARKER: &str = "lang=";

/// Read the `URL` column of the first worksheet in `path`.
pub fn read_url_column(path: &Path) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| AppError::Spreadsheet {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Spreadsheet {
            path: path.to_path_buf(),
            message: "workbook has no worksheets".into(),
        })?
        .map_err(|e| AppError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let urls = urls_from_range(&range).ok_or_else(|| AppError::MissingUrlColumn(path.to_path_buf()))?;
    tracing::info!(path = %path.display(), count = urls.len(), "read url column");
    Ok(urls)
}

/// Values under the `URL` header of the first row, skipping blank cells.
/// `None` when no such header exists.
pub fn urls_from_range(range: &Range<Data>) -> Option<Vec<String>> {
    let mut rows = range.rows();
    let header = rows.next()?;
    let col = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s == URL_HEADER))?;

    Some(
        rows.filter_map(|row| match row.get(col) {
            None | Some(Data::Empty) => None,
            Some(Data::String(s)) if s.trim().is_empty() => None,
            Some(Data::String(s)) => Some(s.trim().to_string()),
            Some(other) => Some(other.to_string()),
        })
        .collect(),
    )
}

/// Drop locale-variant URLs (those containing `lang=`), keeping order.
pub fn filter_locale_urls(urls: Vec<String>) -> Vec<String> {
    let before = urls.len();
    let kept: Vec<String> = urls.into_iter().filter(|u| !u.contains(LOCALE_MARKER)).collect();
    if kept.len() != before {
        tracing::debug!(dropped = before - kept.len(), "skipped locale urls");
    }
    kept
}
