use crate::errors::EvalResult;
use crate::working_set::{CategoryStats, FilterInputs, OverallStats, WorkingSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

/// Machine-readable accuracy summary of one filtered dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub schema_version: u32,
    pub provenance: Provenance,
    pub overall: OverallStats,
    pub categories: Vec<CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub evalviz_version: String,
    pub dataset_id: String,
    /// `sha256:<hex>` of the dataset bytes as loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f64>,
}

impl Provenance {
    pub fn new(evalviz_version: &str, dataset_id: &str) -> Self {
        Self {
            evalviz_version: evalviz_version.to_string(),
            dataset_id: dataset_id.to_string(),
            dataset_digest: None,
            search: None,
            max_confidence: None,
        }
    }

    pub fn with_filters(mut self, filters: &FilterInputs) -> Self {
        self.search = filters.search.clone().filter(|s| !s.is_empty());
        self.max_confidence = filters.max_confidence;
        self
    }

    pub fn with_digest(mut self, digest: Option<String>) -> Self {
        self.dataset_digest = digest;
        self
    }
}

impl Summary {
    pub fn from_working_set(ws: &WorkingSet, provenance: Provenance) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            provenance,
            overall: ws.overall(),
            categories: ws.all_category_stats(),
        }
    }
}

pub fn dataset_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

pub fn write_summary(summary: &Summary, out: &Path) -> EvalResult<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(out, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::working_set::build_working_set;

    #[test]
    fn digest_is_prefixed_hex() {
        let d = dataset_digest(b"[]");
        assert!(d.starts_with("sha256:"));
        assert_eq!(d.len(), "sha256:".len() + 64);
        assert_eq!(d, dataset_digest(b"[]"));
    }

    #[test]
    fn empty_dataset_serializes_sentinels_as_null() {
        let ws = build_working_set(&[], None, None);
        let s = Summary::from_working_set(&ws, Provenance::new("0.1.0", "basic_new"));
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["schema_version"], 1);
        assert_eq!(v["overall"]["records"], 0);
        assert!(v["overall"]["correct_pct"].is_null());
        assert!(v["provenance"].get("dataset_digest").is_none());
    }

    #[test]
    fn writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("summary.json");
        let ws = build_working_set(&[], None, None);
        let prov = Provenance::new("0.1.0", "v1_run").with_filters(&FilterInputs {
            search: Some(String::new()),
            max_confidence: Some(0.5),
        });
        write_summary(&Summary::from_working_set(&ws, prov), &out).unwrap();

        let raw = std::fs::read_to_string(&out).unwrap();
        assert!(raw.contains("\"max_confidence\": 0.5"));
        assert!(!raw.contains("\"search\""));
    }
}
