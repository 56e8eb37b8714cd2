pub mod attention;
pub mod color;
pub mod compare;
pub mod confidence;
pub mod config;
pub mod ddl;
pub mod errors;
pub mod logprobs;
pub mod model;
pub mod providers;
pub mod reference;
pub mod report;
pub mod results;
pub mod session;
pub mod slot;
pub mod sql_format;
pub mod working_set;

pub use color::{color_for, Domain};
pub use errors::{EvalError, EvalResult};
pub use model::{EvalRecord, RawTokenLogprob, TokenCandidate};
pub use session::{InspectorSession, QueryKind};
pub use working_set::{build_working_set, WorkingSet};

/// Parses a dataset file body (a JSON array of records).
pub fn parse_dataset(raw: &str) -> EvalResult<Vec<EvalRecord>> {
    serde_json::from_str(raw).map_err(|e| EvalError::MalformedDataset(e.to_string()))
}
