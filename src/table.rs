// Row aggregation: per-URL responses into one `keyword` / `url` table.

use crate::api::QueryResponse;
use serde_json::{Map, Value};
use unicode_width::UnicodeWidthStr;

/// One (keyword, page) pair with its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRow {
    pub keyword: String,
    pub url: String,
    pub metrics: Map<String, Value>,
}

/// Concatenation of every retained response's rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeywordTable {
    pub rows: Vec<KeywordRow>,
    /// Metric names in first-appearance order.
    pub metric_columns: Vec<String>,
}

/// Split each row's key pair into `keyword` and `url`.
///
/// `None` when the response carries no `rows` field. Short key lists
/// leave the missing columns empty; extra keys are ignored.
pub fn rows_from_response(response: &QueryResponse) -> Option<Vec<KeywordRow>> {
    let rows = response.rows.as_ref()?;
    Some(
        rows.iter()
            .map(|row| KeywordRow {
                keyword: row.keys.first().cloned().unwrap_or_default(),
                url: row.keys.get(1).cloned().unwrap_or_default(),
                metrics: row.metrics.clone(),
            })
            .collect(),
    )
}

/// Concatenate responses in order, skipping failed (`None`) ones and
/// ones without rows. `None` when nothing was retained.
pub fn combine<I>(responses: I) -> Option<KeywordTable>
where
    I: IntoIterator<Item = Option<QueryResponse>>,
{
    let mut table: Option<KeywordTable> = None;
    for response in responses.into_iter().flatten() {
        if let Some(rows) = rows_from_response(&response) {
            table.get_or_insert_with(KeywordTable::default).extend(rows);
        }
    }
    table
}

impl KeywordTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn extend(&mut self, rows: Vec<KeywordRow>) {
        for row in &rows {
            for name in row.metrics.keys() {
                if !self.metric_columns.iter().any(|c| c == name) {
                    self.metric_columns.push(name.clone());
                }
            }
        }
        self.rows.extend(rows);
    }

    /// Header names in display order: metrics, then keyword and url.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = self.metric_columns.clone();
        cols.push("keyword".into());
        cols.push("url".into());
        cols
    }

    /// Cell text for every row, matching `columns()`.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = self
                    .metric_columns
                    .iter()
                    .map(|c| row.metrics.get(c).map(format_value).unwrap_or_default())
                    .collect();
                cells.push(row.keyword.clone());
                cells.push(row.url.clone());
                cells
            })
            .collect()
    }

    /// Plain fixed-width rendering with a header rule. Columns are sized
    /// by terminal display width, so wide (CJK, emoji) keywords line up.
    pub fn render(&self) -> String {
        let header = self.columns();
        let body = self.cells();
        let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
        for row in &body {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &body {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| {
            let mut cell = c.clone();
            cell.push_str(&" ".repeat(w.saturating_sub(c.width())));
            cell
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Integral numbers print without a fraction; others keep four decimals.
fn format_value(v: &Value) -> String {
    match v {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            (None, Some(f)) => {
                let s = format!("{f:.4}");
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
