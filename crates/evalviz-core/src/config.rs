//! `evalviz.yaml` loading with `EVALVIZ_*` environment overrides.

use crate::errors::{EvalError, EvalResult};
use crate::reference::ReferenceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "evalviz.yaml";
pub const DEFAULT_MODEL_NAME: &str = "defog/sqlcoder8b-padded-alpha";
pub const MANIFEST_FILE: &str = "fnames.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalVizConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub datasets: DatasetsConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub attention: AttentionConfig,
    #[serde(default)]
    pub references: ReferencesConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetsConfig {
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default)]
    pub remote_bucket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_query_endpoint")]
    pub query: String,
    #[serde(default = "default_attention_endpoint")]
    pub attention: String,
    #[serde(default)]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

/// Golden reference files, each a local path or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencesConfig {
    #[serde(default = "default_advanced_ref")]
    pub advanced: String,
    #[serde(default = "default_v1_ref")]
    pub v1: String,
    #[serde(default = "default_basic_ref")]
    pub basic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub max_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_query_endpoint() -> String {
    "http://localhost:8000/run_query".to_string()
}

fn default_attention_endpoint() -> String {
    "http://localhost:8000/attention".to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_advanced_ref() -> String {
    "references/questions_gen_advanced.json".to_string()
}

fn default_v1_ref() -> String {
    "references/questions_gen_v1.json".to_string()
}

fn default_basic_ref() -> String {
    "references/questions_gen_basic.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            manifest_url: None,
            remote_bucket: None,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            query: default_query_endpoint(),
            attention: default_attention_endpoint(),
            metadata: None,
        }
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
        }
    }
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            advanced: default_advanced_ref(),
            v1: default_v1_ref(),
            basic: default_basic_ref(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for EvalVizConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            datasets: DatasetsConfig::default(),
            endpoints: EndpointsConfig::default(),
            attention: AttentionConfig::default(),
            references: ReferencesConfig::default(),
            filters: FiltersConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl ReferencesConfig {
    pub fn location(&self, kind: ReferenceKind) -> &str {
        match kind {
            ReferenceKind::Advanced => &self.advanced,
            ReferenceKind::V1 => &self.v1,
            ReferenceKind::Basic => &self.basic,
        }
    }
}

impl DatasetsConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.local_dir.join(MANIFEST_FILE)
    }

    pub fn local_path(&self, id: &str) -> PathBuf {
        self.local_dir.join(format!("{id}.json"))
    }

    pub fn remote_url(&self, id: &str) -> Option<String> {
        self.remote_bucket
            .as_deref()
            .map(|b| format!("{}/{id}.json", b.trim_end_matches('/')))
    }
}

impl EvalVizConfig {
    /// Applies `EVALVIZ_*` overrides. Unparseable numeric values are ignored.
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("EVALVIZ_DATA_DIR") {
            self.datasets.local_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("EVALVIZ_REMOTE_BUCKET") {
            self.datasets.remote_bucket = Some(v);
        }
        if let Ok(v) = std::env::var("EVALVIZ_MANIFEST_URL") {
            self.datasets.manifest_url = Some(v);
        }
        if let Ok(v) = std::env::var("EVALVIZ_QUERY_ENDPOINT") {
            self.endpoints.query = v;
        }
        if let Ok(v) = std::env::var("EVALVIZ_ATTENTION_ENDPOINT") {
            self.endpoints.attention = v;
        }
        if let Ok(v) = std::env::var("EVALVIZ_METADATA_ENDPOINT") {
            self.endpoints.metadata = Some(v);
        }
        if let Some(v) = env_parse("EVALVIZ_HTTP_TIMEOUT") {
            self.http.timeout_secs = v;
        }
        if let Some(v) = env_parse("EVALVIZ_HTTP_MAX_RETRIES") {
            self.http.max_retries = v;
        }
        self
    }

    fn validate(&self) -> EvalResult<()> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(EvalError::Config(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if let Some(t) = self.filters.max_confidence {
            if !(0.0..=1.0).contains(&t) {
                return Err(EvalError::Config(format!(
                    "filters.max_confidence must be within [0, 1], got {t}"
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

pub fn load_config(path: &Path) -> EvalResult<EvalVizConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EvalError::Config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    let cfg: EvalVizConfig = serde_yaml::from_str(&raw)
        .map_err(|e| EvalError::Config(format!("failed to parse YAML: {}", e)))?;
    let cfg = cfg.apply_env();
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `path` when it exists, otherwise defaults; env overrides apply either way.
pub fn load_or_default(path: &Path) -> EvalResult<EvalVizConfig> {
    if path.exists() {
        return load_config(path);
    }
    let cfg = EvalVizConfig::default().apply_env();
    cfg.validate()?;
    Ok(cfg)
}
