//! HTTP and filesystem implementation of the evalviz collaborators.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `EVALVIZ_DATA_DIR` | Local dataset directory holding `fnames.json` (default: `public`) |
//! | `EVALVIZ_REMOTE_BUCKET` | Base URL for datasets not listed in the manifest |
//! | `EVALVIZ_MANIFEST_URL` | Manifest URL, replacing `<data dir>/fnames.json` |
//! | `EVALVIZ_QUERY_ENDPOINT` | Query execution endpoint |
//! | `EVALVIZ_ATTENTION_ENDPOINT` | Attention endpoint |
//! | `EVALVIZ_METADATA_ENDPOINT` | Table metadata endpoint |
//! | `EVALVIZ_HTTP_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `EVALVIZ_HTTP_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod client;
pub mod error;
pub mod types;

pub use client::EvalClient;
pub use error::{ClientError, ClientResult};
pub use types::{ClientConfig, FreeformRequest};
