//! Shapes query-execution results for display.
//!
//! Headers come from the first row's field names, in that row's order. Later
//! rows are rendered positionally and are assumed to share the same fields;
//! rows with a different field set may come out misaligned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;
pub type RowSet = Vec<Row>;

pub const NO_RESULTS: &str = "No results to display.";

/// What the execution endpoint sends back in `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(RowSet),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presented {
    Table(DisplayTable),
    NoResults,
    Error { message: String },
}

pub fn present(outcome: &QueryOutcome) -> Presented {
    match outcome {
        QueryOutcome::Error { error } => Presented::Error {
            message: error.clone(),
        },
        QueryOutcome::Rows(rows) => match rows.first() {
            None => Presented::NoResults,
            Some(first) => Presented::Table(DisplayTable {
                headers: first.keys().map(|k| header_label(k)).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.values().map(cell_text).collect())
                    .collect(),
            }),
        },
    }
}

/// `order_id` -> `ORDER ID`; only the first underscore becomes a space.
pub fn header_label(key: &str) -> String {
    key.replacen('_', " ", 1).to_uppercase()
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl DisplayTable {
    /// Fixed-width text rendering for terminals.
    pub fn to_text(&self) -> String {
        let cols = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; cols];
        for line in std::iter::once(&self.headers).chain(self.rows.iter()) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let fmt_line = |line: &[String]| -> String {
            line.iter()
                .enumerate()
                .map(|(i, c)| format!("{:<w$}", c, w = widths[i]))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = fmt_line(&self.headers);
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            out.push('\n');
            out.push_str(&fmt_line(row));
        }
        out
    }
}
