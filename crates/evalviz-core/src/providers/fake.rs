use super::{DatasetSource, EvalBackend, FreeformCompletion, QueryRequest};
use crate::attention::AttentionTrace;
use crate::ddl::TableMetadata;
use crate::model::EvalRecord;
use crate::reference::{ReferenceKind, ReferenceSet};
use crate::results::QueryOutcome;
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory backend for tests and offline runs.
#[derive(Debug, Default)]
pub struct FakeBackend {
    manifest: Vec<String>,
    datasets: HashMap<String, Vec<EvalRecord>>,
    outcomes: HashMap<String, QueryOutcome>,
    attention: Option<AttentionTrace>,
    metadata: TableMetadata,
    references: HashMap<ReferenceKind, ReferenceSet>,
    freeform: Option<FreeformCompletion>,
    fail_queries: bool,
    queries: Mutex<Vec<QueryRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, ids: &[&str]) -> Self {
        self.manifest = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_dataset(mut self, id: &str, records: Vec<EvalRecord>) -> Self {
        self.datasets.insert(id.to_string(), records);
        self
    }

    /// Outcome returned for an exact (already stripped) query text.
    pub fn with_outcome(mut self, query: &str, outcome: QueryOutcome) -> Self {
        self.outcomes.insert(query.to_string(), outcome);
        self
    }

    pub fn with_attention(mut self, trace: AttentionTrace) -> Self {
        self.attention = Some(trace);
        self
    }

    pub fn with_metadata(mut self, metadata: TableMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_reference(mut self, set: ReferenceSet) -> Self {
        self.references.insert(set.kind, set);
        self
    }

    pub fn with_freeform(mut self, completion: FreeformCompletion) -> Self {
        self.freeform = Some(completion);
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Every query request received so far.
    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EvalBackend for FakeBackend {
    async fn fetch_manifest(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.manifest.clone())
    }

    async fn fetch_dataset(
        &self,
        id: &str,
        _source: DatasetSource,
    ) -> anyhow::Result<Vec<EvalRecord>> {
        self.datasets
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("dataset not found: {id}"))
    }

    async fn run_query(&self, request: &QueryRequest) -> anyhow::Result<QueryOutcome> {
        if let Ok(mut seen) = self.queries.lock() {
            seen.push(request.clone());
        }
        if self.fail_queries {
            return Err(anyhow!("connection refused"));
        }
        Ok(self
            .outcomes
            .get(&request.query)
            .cloned()
            .unwrap_or(QueryOutcome::Rows(Vec::new())))
    }

    async fn fetch_attention(
        &self,
        _prompt: &str,
        _model_name: &str,
    ) -> anyhow::Result<Option<AttentionTrace>> {
        Ok(self.attention.clone())
    }

    async fn fetch_metadata(&self, _api_key: &str) -> anyhow::Result<TableMetadata> {
        Ok(self.metadata.clone())
    }

    async fn fetch_reference(&self, kind: ReferenceKind) -> anyhow::Result<ReferenceSet> {
        self.references
            .get(&kind)
            .cloned()
            .ok_or_else(|| anyhow!("reference file '{kind}' unavailable"))
    }

    async fn complete_freeform(
        &self,
        _url: &str,
        _prompt: &str,
    ) -> anyhow::Result<FreeformCompletion> {
        self.freeform
            .clone()
            .ok_or_else(|| anyhow!("no completion configured"))
    }
}
