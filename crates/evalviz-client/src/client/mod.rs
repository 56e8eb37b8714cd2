//! Client for the dataset sources and the query, attention, metadata and
//! completion services.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use evalviz_core::attention::AttentionTrace;
use evalviz_core::ddl::TableMetadata;
use evalviz_core::model::EvalRecord;
use evalviz_core::providers::{DatasetSource, EvalBackend, FreeformCompletion, QueryRequest};
use evalviz_core::reference::{ReferenceKind, ReferenceSet};
use evalviz_core::results::QueryOutcome;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::types::{
    is_http_url, AttentionRequest, AttentionResponse, ClientConfig, FreeformRequest,
    MetadataRequest, RunQueryResponse,
};

mod http;

use http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("evalviz/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct EvalClient {
    http: HttpBackend,
    config: ClientConfig,
}

impl EvalClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                max_retries: config.max_retries,
            },
            config,
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dataset ids, from `manifest_url` when set, else `<local_dir>/fnames.json`.
    pub async fn fetch_manifest(&self) -> ClientResult<Vec<String>> {
        match &self.config.manifest_url {
            Some(url) => {
                debug!(url = %url, "fetching manifest");
                self.http.get_json(url).await
            }
            None => read_json_file(&self.config.manifest_path()).await,
        }
    }

    pub async fn fetch_dataset(
        &self,
        id: &str,
        source: DatasetSource,
    ) -> ClientResult<Vec<EvalRecord>> {
        parse_records(&self.fetch_dataset_raw(id, source).await?, id)
    }

    /// Dataset body as served, for digesting before parsing.
    pub async fn fetch_dataset_raw(&self, id: &str, source: DatasetSource) -> ClientResult<String> {
        let id = id.strip_suffix(".json").unwrap_or(id);
        match source {
            DatasetSource::Local => {
                let path = self.config.local_dir.join(format!("{id}.json"));
                debug!(path = %path.display(), "reading local dataset");
                read_text_file(&path).await
            }
            DatasetSource::Remote => {
                let bucket = self.config.remote_bucket.as_deref().ok_or_else(|| {
                    ClientError::Config {
                        message: format!(
                            "dataset '{id}' is not in the manifest and no remote bucket is configured"
                        ),
                    }
                })?;
                let url = format!("{}/{id}.json", bucket.trim_end_matches('/'));
                debug!(url = %url, "fetching remote dataset");
                self.http.get_text(&url).await
            }
        }
    }

    /// Resolves `id` against the manifest, then fetches it.
    pub async fn load_dataset(&self, id: &str) -> ClientResult<(String, Vec<EvalRecord>)> {
        let manifest = self.fetch_manifest().await?;
        let source = DatasetSource::resolve(id, &manifest);
        let raw = self.fetch_dataset_raw(id, source).await?;
        let records = parse_records(&raw, id)?;
        info!(dataset = id, records = records.len(), ?source, "dataset fetched");
        Ok((raw, records))
    }

    pub async fn run_query(&self, request: &QueryRequest) -> ClientResult<QueryOutcome> {
        let url = &self.config.query_endpoint;
        debug!(url = %url, db_type = %request.db_type, db_name = %request.db_name, "running query");
        let response: RunQueryResponse = self.http.post_json(url, request).await?;
        Ok(response.result)
    }

    /// `Ok(None)` when the service answers without an `activations` field.
    pub async fn fetch_attention(
        &self,
        prompt: &str,
        model_name: &str,
    ) -> ClientResult<Option<AttentionTrace>> {
        let url = &self.config.attention_endpoint;
        debug!(url = %url, model = model_name, "fetching attention trace");
        let response: AttentionResponse = self
            .http
            .post_json(url, &AttentionRequest { prompt, model_name })
            .await?;
        response
            .activations
            .map(AttentionTrace::from_activations)
            .transpose()
            .map_err(|e| ClientError::InvalidResponse {
                message: e.to_string(),
            })
    }

    pub async fn fetch_metadata(&self, api_key: &str) -> ClientResult<TableMetadata> {
        let url = self
            .config
            .metadata_endpoint
            .as_deref()
            .ok_or_else(|| ClientError::Config {
                message: "endpoints.metadata is not configured".to_string(),
            })?;
        debug!(url = %url, "fetching table metadata");
        self.http.post_json(url, &MetadataRequest { api_key }).await
    }

    /// Reference files live at a path or an http(s) URL.
    pub async fn fetch_reference(&self, kind: ReferenceKind) -> ClientResult<ReferenceSet> {
        let location = self.config.references.location(kind);
        debug!(reference = %kind, location = location, "loading golden reference");
        let raw = if is_http_url(location) {
            self.http.get_text(location).await?
        } else {
            read_text_file(Path::new(location)).await?
        };
        ReferenceSet::from_json(kind, &raw).map_err(|e| ClientError::InvalidResponse {
            message: e.to_string(),
        })
    }

    pub async fn complete_freeform(
        &self,
        url: &str,
        prompt: &str,
    ) -> ClientResult<FreeformCompletion> {
        if !is_http_url(url) {
            return Err(ClientError::Config {
                message: format!("invalid completion server URL '{url}'"),
            });
        }
        debug!(url = %url, "requesting free-form completion");
        self.http.post_json(url, &FreeformRequest::new(prompt)).await
    }
}

fn parse_records(raw: &str, id: &str) -> ClientResult<Vec<EvalRecord>> {
    evalviz_core::parse_dataset(raw).map_err(|e| ClientError::InvalidResponse {
        message: format!("dataset '{id}': {e}"),
    })
}

async fn read_text_file(path: &Path) -> ClientResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ClientError::NotFound {
                url: path.display().to_string(),
            }
        } else {
            ClientError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        }
    })
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> ClientResult<T> {
    let raw = read_text_file(path).await?;
    serde_json::from_str(&raw).map_err(|e| ClientError::InvalidResponse {
        message: format!("{}: {}", path.display(), e),
    })
}

#[async_trait]
impl EvalBackend for EvalClient {
    async fn fetch_manifest(&self) -> anyhow::Result<Vec<String>> {
        Ok(EvalClient::fetch_manifest(self).await?)
    }

    async fn fetch_dataset(
        &self,
        id: &str,
        source: DatasetSource,
    ) -> anyhow::Result<Vec<EvalRecord>> {
        Ok(EvalClient::fetch_dataset(self, id, source).await?)
    }

    async fn run_query(&self, request: &QueryRequest) -> anyhow::Result<QueryOutcome> {
        Ok(EvalClient::run_query(self, request).await?)
    }

    async fn fetch_attention(
        &self,
        prompt: &str,
        model_name: &str,
    ) -> anyhow::Result<Option<AttentionTrace>> {
        Ok(EvalClient::fetch_attention(self, prompt, model_name).await?)
    }

    async fn fetch_metadata(&self, api_key: &str) -> anyhow::Result<TableMetadata> {
        Ok(EvalClient::fetch_metadata(self, api_key).await?)
    }

    async fn fetch_reference(&self, kind: ReferenceKind) -> anyhow::Result<ReferenceSet> {
        Ok(EvalClient::fetch_reference(self, kind).await?)
    }

    async fn complete_freeform(
        &self,
        url: &str,
        prompt: &str,
    ) -> anyhow::Result<FreeformCompletion> {
        Ok(EvalClient::complete_freeform(self, url, prompt).await?)
    }
}
