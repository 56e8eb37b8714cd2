//! Golden reference files used for the postgres cross-check.
//!
//! Each reference file is a JSON array of `{question, query, db_name?}`
//! entries. Which file applies is decided by the dataset identifier.

use crate::errors::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};

/// Substrings checked against the dataset id, in priority order.
pub const REFERENCE_KINDS: [ReferenceKind; 3] = [
    ReferenceKind::Advanced,
    ReferenceKind::V1,
    ReferenceKind::Basic,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Advanced,
    V1,
    Basic,
}

impl ReferenceKind {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Advanced => "advanced",
            Self::V1 => "v1",
            Self::Basic => "basic",
        }
    }

    pub fn for_dataset(dataset_id: &str) -> EvalResult<Self> {
        REFERENCE_KINDS
            .into_iter()
            .find(|k| dataset_id.contains(k.marker()))
            .ok_or_else(|| EvalError::NoReferenceFile {
                dataset: dataset_id.to_string(),
            })
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub question: String,
    pub query: String,
    #[serde(default)]
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSet {
    pub kind: ReferenceKind,
    pub entries: Vec<ReferenceEntry>,
}

impl ReferenceSet {
    pub fn new(kind: ReferenceKind, entries: Vec<ReferenceEntry>) -> Self {
        Self { kind, entries }
    }

    pub fn from_json(kind: ReferenceKind, raw: &str) -> EvalResult<Self> {
        let entries = serde_json::from_str(raw).map_err(|e| {
            EvalError::MalformedDataset(format!("reference file '{kind}': {e}"))
        })?;
        Ok(Self::new(kind, entries))
    }

    /// Gold query for `question`. When the entry carries a `db_name`, it must
    /// match too; questions repeat across databases in some reference files.
    pub fn gold_query(&self, question: &str, db_name: &str) -> EvalResult<&str> {
        let mut candidates = self.entries.iter().filter(|e| e.question == question);
        let first = candidates.next();
        first
            .into_iter()
            .chain(candidates)
            .find(|e| e.db_name.as_deref().map_or(true, |d| d == db_name))
            .or(first)
            .map(|e| e.query.as_str())
            .ok_or_else(|| EvalError::QuestionNotInReference {
                reference: self.kind.to_string(),
                question: question.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_kind_in_priority_order() {
        assert_eq!(
            ReferenceKind::for_dataset("advanced_v1_run").unwrap(),
            ReferenceKind::Advanced
        );
        assert_eq!(
            ReferenceKind::for_dataset("sqlcoder_v1_basic").unwrap(),
            ReferenceKind::V1
        );
        assert_eq!(
            ReferenceKind::for_dataset("basic_new").unwrap(),
            ReferenceKind::Basic
        );
    }

    #[test]
    fn unknown_dataset_is_a_config_error() {
        let err = ReferenceKind::for_dataset("instruct_run").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("instruct_run"));
    }

    #[test]
    fn looks_up_by_question_and_db() {
        let set = ReferenceSet::from_json(
            ReferenceKind::Basic,
            r#"[
                {"question": "how many users", "query": "SELECT 1", "db_name": "shop"},
                {"question": "how many users", "query": "SELECT 2", "db_name": "forum"},
                {"question": "top posts", "query": "SELECT 3"}
            ]"#,
        )
        .unwrap();

        assert_eq!(set.gold_query("how many users", "forum").unwrap(), "SELECT 2");
        assert_eq!(set.gold_query("how many users", "other").unwrap(), "SELECT 1");
        assert_eq!(set.gold_query("top posts", "any").unwrap(), "SELECT 3");
    }

    #[test]
    fn missing_question_is_reported() {
        let set = ReferenceSet::new(ReferenceKind::V1, vec![]);
        let err = set.gold_query("nope", "db").unwrap_err();
        assert!(matches!(err, EvalError::QuestionNotInReference { .. }));
        assert!(!err.is_config());
    }
}
