//! Side-by-side view of two working sets (e.g. two model runs on one suite).

use crate::working_set::{CategoryStats, WorkingSet};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryComparison {
    pub category: String,
    pub left: CategoryStats,
    pub right: CategoryStats,
}

impl CategoryComparison {
    /// `right - left` accuracy in points; `None` when either side is empty.
    pub fn delta(&self) -> Option<f64> {
        match (self.left.accuracy_pct, self.right.accuracy_pct) {
            (Some(l), Some(r)) => Some(((r - l) * 100.0).round() / 100.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// Correct on the left, wrong on the right.
    Regressed,
    /// Wrong on the left, correct on the right.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDiff {
    pub db_name: String,
    pub question: String,
    pub category: String,
    pub kind: Divergence,
}

/// Per-category comparison over the union of both category lists, left
/// categories first.
pub fn compare_categories(left: &WorkingSet, right: &WorkingSet) -> Vec<CategoryComparison> {
    let mut cats: Vec<&String> = left.categories.iter().collect();
    for c in &right.categories {
        if !cats.contains(&c) {
            cats.push(c);
        }
    }
    cats.into_iter()
        .map(|c| CategoryComparison {
            category: c.clone(),
            left: left.category_stats(c),
            right: right.category_stats(c),
        })
        .collect()
}

/// Questions present in both sets whose correctness differs, in left order.
pub fn diverging_questions(left: &WorkingSet, right: &WorkingSet) -> Vec<QuestionDiff> {
    left.records
        .iter()
        .filter_map(|l| {
            let r = right.find(&l.db_name, &l.question)?;
            let kind = match (l.is_correct(), r.is_correct()) {
                (true, false) => Divergence::Regressed,
                (false, true) => Divergence::Fixed,
                _ => return None,
            };
            Some(QuestionDiff {
                db_name: l.db_name.clone(),
                question: l.question.clone(),
                category: l.query_category.clone(),
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvalRecord;
    use crate::working_set::build_working_set;

    fn rec(q: &str, correct: u8, cat: &str) -> EvalRecord {
        serde_json::from_value(serde_json::json!({
            "question": q,
            "db_name": "db",
            "correct": correct,
            "query_category": cat
        }))
        .unwrap()
    }

    #[test]
    fn union_of_categories_with_missing_side_as_sentinel() {
        let left = build_working_set(&[rec("1", 1, "a"), rec("2", 0, "b")], None, None);
        let right = build_working_set(&[rec("1", 0, "a"), rec("3", 1, "c")], None, None);
        let cmp = compare_categories(&left, &right);
        let names: Vec<&str> = cmp.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(cmp[0].delta(), Some(-100.0));
        assert_eq!(cmp[1].right.accuracy_pct, None);
        assert_eq!(cmp[1].delta(), None);
    }

    #[test]
    fn reports_regressions_and_fixes() {
        let left = build_working_set(&[rec("1", 1, "a"), rec("2", 0, "a"), rec("3", 1, "a")], None, None);
        let right = build_working_set(&[rec("1", 0, "a"), rec("2", 1, "a"), rec("3", 1, "a")], None, None);
        let diffs = diverging_questions(&left, &right);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].kind, Divergence::Regressed);
        assert_eq!(diffs[1].kind, Divergence::Fixed);
    }
}
