//! External collaborators behind one async trait.

use crate::attention::AttentionTrace;
use crate::ddl::TableMetadata;
use crate::model::{EvalRecord, RawTokenLogprob};
use crate::reference::{ReferenceKind, ReferenceSet};
use crate::results::QueryOutcome;
use crate::sql_format::strip_placeholders;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fake;

/// Body of a query-execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub db_type: String,
    pub db_name: String,
}

impl QueryRequest {
    /// Strips placeholder braces and lowercases the dialect.
    pub fn new(query: &str, db_type: &str, db_name: &str) -> Self {
        Self {
            query: strip_placeholders(query),
            db_type: db_type.to_lowercase(),
            db_name: db_name.to_string(),
        }
    }

    pub fn gold(record: &EvalRecord) -> Self {
        Self::new(&record.query, &record.db_type, &record.db_name)
    }

    pub fn generated(record: &EvalRecord) -> Self {
        Self::new(&record.generated_query, &record.db_type, &record.db_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeformCompletion {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub logprobs: Vec<RawTokenLogprob>,
}

impl FreeformCompletion {
    pub fn first_text(&self) -> &str {
        self.text.first().map_or("", String::as_str)
    }
}

/// Where a dataset id is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    Local,
    Remote,
}

impl DatasetSource {
    /// Local iff the manifest lists the id; entries may carry a `.json` suffix.
    pub fn resolve(id: &str, manifest: &[String]) -> Self {
        let id = id.strip_suffix(".json").unwrap_or(id);
        if manifest
            .iter()
            .any(|m| m.strip_suffix(".json").unwrap_or(m) == id)
        {
            Self::Local
        } else {
            Self::Remote
        }
    }
}

#[async_trait]
pub trait EvalBackend: Send + Sync {
    async fn fetch_manifest(&self) -> anyhow::Result<Vec<String>>;

    async fn fetch_dataset(&self, id: &str, source: DatasetSource)
        -> anyhow::Result<Vec<EvalRecord>>;

    async fn run_query(&self, request: &QueryRequest) -> anyhow::Result<QueryOutcome>;

    /// `Ok(None)` when the service answered without activations.
    async fn fetch_attention(
        &self,
        prompt: &str,
        model_name: &str,
    ) -> anyhow::Result<Option<AttentionTrace>>;

    async fn fetch_metadata(&self, api_key: &str) -> anyhow::Result<TableMetadata>;

    async fn fetch_reference(&self, kind: ReferenceKind) -> anyhow::Result<ReferenceSet>;

    async fn complete_freeform(&self, url: &str, prompt: &str)
        -> anyhow::Result<FreeformCompletion>;
}
