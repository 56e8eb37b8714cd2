use thiserror::Error;

/// Errors raised at the edges of the engine. Pure computations never fail.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no golden reference file matches dataset '{dataset}' (expected one of: advanced, v1, basic)")]
    NoReferenceFile { dataset: String },

    #[error("question not found in golden reference '{reference}': {question}")]
    QuestionNotInReference { reference: String, question: String },

    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("malformed attention trace: {0}")]
    MalformedTrace(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// True for errors caused by configuration rather than by data or transport.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::NoReferenceFile { .. })
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
