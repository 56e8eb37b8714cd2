//! Client configuration and wire bodies of the collaborator endpoints.

use std::collections::HashMap;
use std::path::PathBuf;

use evalviz_core::attention::AttentionStep;
use evalviz_core::config::{EvalVizConfig, ReferencesConfig, MANIFEST_FILE};
use evalviz_core::results::QueryOutcome;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub local_dir: PathBuf,
    pub manifest_url: Option<String>,
    pub remote_bucket: Option<String>,
    pub query_endpoint: String,
    pub attention_endpoint: String,
    pub metadata_endpoint: Option<String>,
    pub references: ReferencesConfig,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&EvalVizConfig::default())
    }
}

impl From<&EvalVizConfig> for ClientConfig {
    fn from(cfg: &EvalVizConfig) -> Self {
        Self {
            local_dir: cfg.datasets.local_dir.clone(),
            manifest_url: cfg.datasets.manifest_url.clone(),
            remote_bucket: cfg.datasets.remote_bucket.clone(),
            query_endpoint: cfg.endpoints.query.clone(),
            attention_endpoint: cfg.endpoints.attention.clone(),
            metadata_endpoint: cfg.endpoints.metadata.clone(),
            references: cfg.references.clone(),
            timeout_secs: cfg.http.timeout_secs,
            max_retries: cfg.http.max_retries,
        }
    }
}

impl ClientConfig {
    /// Defaults with `EVALVIZ_*` overrides applied.
    pub fn from_env() -> Self {
        Self::from(&EvalVizConfig::default().apply_env())
    }

    pub fn with_query_endpoint(mut self, url: impl Into<String>) -> Self {
        self.query_endpoint = url.into();
        self
    }

    pub fn with_attention_endpoint(mut self, url: impl Into<String>) -> Self {
        self.attention_endpoint = url.into();
        self
    }

    pub fn with_metadata_endpoint(mut self, url: impl Into<String>) -> Self {
        self.metadata_endpoint = Some(url.into());
        self
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = dir.into();
        self
    }

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = Some(url.into());
        self
    }

    pub fn with_remote_bucket(mut self, url: impl Into<String>) -> Self {
        self.remote_bucket = Some(url.into());
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.local_dir.join(MANIFEST_FILE)
    }

    /// Rejects endpoints that are not absolute http(s) URLs.
    pub fn validate(&self) -> ClientResult<()> {
        let urls = [
            ("endpoints.query", Some(self.query_endpoint.as_str())),
            ("endpoints.attention", Some(self.attention_endpoint.as_str())),
            ("endpoints.metadata", self.metadata_endpoint.as_deref()),
            ("datasets.manifest_url", self.manifest_url.as_deref()),
            ("datasets.remote_bucket", self.remote_bucket.as_deref()),
        ];
        for (field, value) in urls {
            if let Some(value) = value {
                check_http_url(field, value)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn is_http_url(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn check_http_url(field: &str, value: &str) -> ClientResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| ClientError::Config {
        message: format!("{field}: invalid URL '{value}': {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::Config {
            message: format!("{field}: unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunQueryResponse {
    pub result: QueryOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttentionRequest<'a> {
    pub prompt: &'a str,
    pub model_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AttentionResponse {
    #[serde(default)]
    pub activations: Option<HashMap<String, AttentionStep>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MetadataRequest<'a> {
    pub api_key: &'a str,
}

/// Sampling parameters sent to a free-form completion server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeformRequest<'a> {
    pub prompt: &'a str,
    pub n: u32,
    pub use_beam_search: bool,
    pub best_of: u32,
    pub temperature: f64,
    pub max_tokens: u32,
    pub seed: u64,
    pub logprobs: u32,
}

impl<'a> FreeformRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            n: 1,
            use_beam_search: false,
            best_of: 1,
            temperature: 0.0,
            max_tokens: 100,
            seed: 42,
            logprobs: 2,
        }
    }
}
