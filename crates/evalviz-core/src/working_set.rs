//! Filtered, sorted and grouped view over a loaded dataset.
//!
//! The working set is rebuilt from scratch whenever the search pattern or
//! the confidence threshold changes. Categories are discovered from the
//! filtered records, never predeclared.

use crate::confidence::sequence_passes_threshold;
use crate::model::EvalRecord;
use serde::Serialize;

/// Rendered in place of a percentage that has no denominator.
pub const NO_VALUE: &str = "—";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInputs {
    pub search: Option<String>,
    pub max_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub records: Vec<EvalRecord>,
    pub categories: Vec<String>,
    pub selected: Option<EvalRecord>,
}

pub fn build_working_set(
    records: &[EvalRecord],
    search_pattern: Option<&str>,
    confidence_threshold: Option<f64>,
) -> WorkingSet {
    // Whether the dataset carries token traces is decided once, on its first
    // record, and then applied to every record.
    let has_traces = records.first().is_some_and(|r| r.logprobs.is_some());
    let needle = search_pattern
        .filter(|p| !p.is_empty())
        .map(str::to_lowercase);

    let mut kept: Vec<EvalRecord> = records
        .iter()
        .filter(|r| needle.as_deref().map_or(true, |n| matches_search(r, n)))
        .filter(|r| match confidence_threshold {
            Some(t) if has_traces => sequence_passes_threshold(r.trace(), t),
            _ => true,
        })
        .cloned()
        .collect();
    sort_records(&mut kept);

    let categories = discover_categories(&kept);
    WorkingSet {
        records: kept,
        categories,
        selected: None,
    }
}

/// Stable order: `db_name`, then `question`, byte-wise.
pub fn sort_records(records: &mut [EvalRecord]) {
    records.sort_by(|a, b| {
        a.db_name
            .cmp(&b.db_name)
            .then_with(|| a.question.cmp(&b.question))
    });
}

fn matches_search(record: &EvalRecord, needle: &str) -> bool {
    record.question.to_lowercase().contains(needle)
        || record.generated_query.to_lowercase().contains(needle)
}

fn discover_categories(records: &[EvalRecord]) -> Vec<String> {
    let mut cats: Vec<String> = Vec::new();
    for r in records {
        if !cats.contains(&r.query_category) {
            cats.push(r.query_category.clone());
        }
    }
    cats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub exec_errors: usize,
    /// `None` for an empty category.
    pub accuracy_pct: Option<f64>,
}

impl CategoryStats {
    pub fn accuracy_label(&self) -> String {
        fmt_pct(self.accuracy_pct, 2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub records: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub correct_pct: Option<f64>,
    pub incorrect_pct: Option<f64>,
}

impl WorkingSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a EvalRecord> {
        self.records
            .iter()
            .filter(move |r| r.query_category == category)
    }

    /// Records of one category, correct ones first, otherwise in working-set order.
    pub fn grid<'a>(&'a self, category: &'a str) -> Vec<&'a EvalRecord> {
        let mut cells: Vec<&EvalRecord> = self.records_in(category).collect();
        cells.sort_by_key(|r| !r.is_correct());
        cells
    }

    pub fn category_stats(&self, category: &str) -> CategoryStats {
        let mut total = 0;
        let mut correct = 0;
        let mut exec_errors = 0;
        for r in self.records_in(category) {
            total += 1;
            if r.is_correct() {
                correct += 1;
            }
            if r.has_exec_error() {
                exec_errors += 1;
            }
        }
        CategoryStats {
            category: category.to_string(),
            total,
            correct,
            incorrect: total - correct,
            exec_errors,
            accuracy_pct: percentage(correct, total).map(|p| round_to(p, 2)),
        }
    }

    pub fn all_category_stats(&self) -> Vec<CategoryStats> {
        self.categories
            .iter()
            .map(|c| self.category_stats(c))
            .collect()
    }

    pub fn overall(&self) -> OverallStats {
        let records = self.records.len();
        let correct = self.records.iter().filter(|r| r.is_correct()).count();
        let incorrect = records - correct;
        OverallStats {
            records,
            correct,
            incorrect,
            correct_pct: percentage(correct, records).map(|p| round_to(p, 3)),
            incorrect_pct: percentage(incorrect, records).map(|p| round_to(p, 3)),
        }
    }

    pub fn find(&self, db_name: &str, question: &str) -> Option<&EvalRecord> {
        self.records
            .iter()
            .find(|r| r.key() == (db_name, question))
    }
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(100.0 * part as f64 / whole as f64)
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

pub fn fmt_pct(v: Option<f64>, places: usize) -> String {
    v.map_or_else(|| NO_VALUE.to_string(), |p| format!("{p:.places$}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawTokenLogprob, TokenCandidate};

    fn rec(db: &str, q: &str, correct: u8, cat: &str) -> EvalRecord {
        EvalRecord {
            question: q.into(),
            db_name: db.into(),
            db_type: "postgres".into(),
            query: String::new(),
            generated_query: format!("SELECT {q}"),
            correct,
            error_db_exec: 0,
            error_msg: None,
            query_category: cat.into(),
            instructions: None,
            prompt: None,
            logprobs: None,
        }
    }

    fn with_top(mut r: EvalRecord, logprob: f64) -> EvalRecord {
        r.logprobs = Some(vec![RawTokenLogprob::new(vec![TokenCandidate {
            rank: 1,
            decoded_token: "SELECT".into(),
            logprob,
        }])]);
        r
    }

    #[test]
    fn sorts_by_db_then_question() {
        let data = vec![
            rec("b", "a", 1, "x"),
            rec("a", "z", 1, "x"),
            rec("a", "m", 1, "x"),
        ];
        let ws = build_working_set(&data, None, None);
        let keys: Vec<_> = ws.records.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec![("a", "m"), ("a", "z"), ("b", "a")]);
    }

    #[test]
    fn search_is_case_insensitive_over_question_and_sql() {
        let mut sql_hit = rec("a", "other", 1, "x");
        sql_hit.generated_query = "SELECT COUNT(*) FROM Users".into();
        let data = vec![rec("a", "How many Orders", 1, "x"), sql_hit, rec("a", "nope", 0, "y")];

        let ws = build_working_set(&data, Some("ORDERS"), None);
        assert_eq!(ws.records.len(), 1);

        let ws = build_working_set(&data, Some("users"), None);
        assert_eq!(ws.records[0].question, "other");

        let ws = build_working_set(&data, Some(""), None);
        assert_eq!(ws.records.len(), 3);
    }

    #[test]
    fn confidence_gate_follows_first_record() {
        // First record has no trace field: the whole dataset is exempt.
        let data = vec![rec("a", "q1", 1, "x"), with_top(rec("a", "q2", 1, "x"), -0.01)];
        let ws = build_working_set(&data, None, Some(0.5));
        assert_eq!(ws.records.len(), 2);

        // First record has a trace: a record without one counts as fully confident.
        let data = vec![with_top(rec("a", "q2", 1, "x"), -2.0), rec("a", "q1", 1, "x")];
        let ws = build_working_set(&data, None, Some(0.5));
        assert_eq!(ws.records.len(), 1);
        assert_eq!(ws.records[0].question, "q2");
    }

    #[test]
    fn categories_in_first_seen_order_after_filtering() {
        let data = vec![
            rec("a", "1", 1, "join"),
            rec("a", "2", 0, "agg"),
            rec("b", "3", 1, "join"),
            rec("c", "zzz", 1, "window"),
        ];
        let ws = build_working_set(&data, Some("SELECT 1"), None);
        assert_eq!(ws.categories, vec!["join".to_string()]);

        let ws = build_working_set(&data, None, None);
        assert_eq!(ws.categories, vec!["join", "agg", "window"]);
    }

    #[test]
    fn category_accuracy_and_sentinel() {
        let data = vec![
            rec("a", "1", 1, "x"),
            rec("a", "2", 0, "x"),
            rec("a", "3", 0, "x"),
        ];
        let ws = build_working_set(&data, None, None);
        let s = ws.category_stats("x");
        assert_eq!(s.total, s.correct + s.incorrect);
        assert_eq!(s.accuracy_pct, Some(33.33));

        let empty = ws.category_stats("missing");
        assert_eq!(empty.accuracy_pct, None);
        assert_eq!(empty.accuracy_label(), "—");
    }

    #[test]
    fn grid_puts_correct_records_first() {
        let data = vec![
            rec("a", "1", 0, "x"),
            rec("a", "2", 1, "x"),
            rec("a", "3", 0, "x"),
            rec("a", "4", 1, "x"),
        ];
        let ws = build_working_set(&data, None, None);
        let order: Vec<&str> = ws.grid("x").iter().map(|r| r.question.as_str()).collect();
        assert_eq!(order, vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn end_to_end_threshold_scenario() {
        let data = vec![
            with_top(rec("b", "q2", 1, "x"), -0.1),
            with_top(rec("a", "q1", 0, "x"), -2.0),
        ];
        let ws = build_working_set(&data, None, Some(0.5));
        assert_eq!(ws.records.len(), 1);
        assert_eq!(ws.records[0].key(), ("a", "q1"));
        assert_eq!(ws.categories, vec!["x"]);
        assert_eq!(ws.category_stats("x").accuracy_pct, Some(0.0));
    }

    #[test]
    fn overall_on_empty_set_uses_sentinel() {
        let ws = build_working_set(&[], None, Some(0.2));
        let o = ws.overall();
        assert_eq!(o.records, 0);
        assert_eq!(fmt_pct(o.correct_pct, 3), "—");
    }
}
