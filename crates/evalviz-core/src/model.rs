use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One evaluated question as stored in an eval dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalRecord {
    pub question: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub db_type: String,
    /// Gold SQL; may contain `{placeholder}` templates.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub generated_query: String,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub correct: u8,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub error_db_exec: u8,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub query_category: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// `None` when the dataset carries no token traces at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Vec<RawTokenLogprob>>,
}

impl EvalRecord {
    pub fn is_correct(&self) -> bool {
        self.correct == 1
    }

    pub fn has_exec_error(&self) -> bool {
        self.error_db_exec == 1
    }

    /// Token trace, empty when absent.
    pub fn trace(&self) -> &[RawTokenLogprob] {
        self.logprobs.as_deref().unwrap_or(&[])
    }

    /// Identity used to keep a selection alive across working-set rebuilds.
    pub fn key(&self) -> (&str, &str) {
        (&self.db_name, &self.question)
    }
}

/// Flags arrive as integers, booleans, or floats (pandas writes `1.0` once a
/// column has held a NaN). Anything else reads as 0.
mod flag {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Float(f64),
        Bool(bool),
        Other(serde::de::IgnoredAny),
    }

    pub fn deserialize<'de, D>(d: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Flag::deserialize(d)? {
            Flag::Int(n) => u8::from(n == 1),
            Flag::Float(f) => u8::from(f == 1.0),
            Flag::Bool(b) => u8::from(b),
            Flag::Other(_) => 0,
        })
    }
}

/// One candidate token at a decoding step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenCandidate {
    pub rank: u32,
    pub decoded_token: String,
    pub logprob: f64,
}

/// One decoding step: its top-K candidates, sorted by rank.
///
/// Decoding never fails: candidates without a numeric logprob are dropped,
/// and a step that is not an object is empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "RankedStep")]
pub struct RawTokenLogprob {
    candidates: Vec<TokenCandidate>,
}

impl RawTokenLogprob {
    pub fn new(mut candidates: Vec<TokenCandidate>) -> Self {
        candidates.sort_by_key(|c| c.rank);
        candidates.dedup_by_key(|c| c.rank);
        Self { candidates }
    }

    pub fn candidates(&self) -> &[TokenCandidate] {
        &self.candidates
    }

    pub fn rank(&self, rank: u32) -> Option<&TokenCandidate> {
        self.candidates.iter().find(|c| c.rank == rank)
    }

    pub fn top(&self) -> Option<&TokenCandidate> {
        self.rank(1)
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct RankedStep(BTreeMap<String, TokenCandidate>);

impl From<RawTokenLogprob> for RankedStep {
    fn from(step: RawTokenLogprob) -> Self {
        RankedStep(
            step.candidates
                .into_iter()
                .map(|c| (c.rank.to_string(), c))
                .collect(),
        )
    }
}

/// Accepts both wire shapes of a step:
/// `{"1": {"rank": 1, "logprob": -0.1, "decoded_token": "SELECT"}, ...}` and
/// the flattened `{"rank_1_token": "SELECT", "rank_1_prob": 0.79, ...}`.
impl From<Value> for RawTokenLogprob {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(parse_step(&map)),
            _ => Self::default(),
        }
    }
}

type FlatFields = (Option<String>, Option<f64>, Option<f64>);

fn parse_step(map: &Map<String, Value>) -> Vec<TokenCandidate> {
    let mut candidates = Vec::new();
    let mut flattened: BTreeMap<u32, FlatFields> = BTreeMap::new();

    for (key, value) in map {
        match key.strip_prefix("rank_") {
            Some(rest) => collect_flattened(&mut flattened, rest, value),
            None => candidates.extend(ranked_candidate(key, value)),
        }
    }

    candidates.extend(flattened.into_iter().filter_map(|(rank, (token, logprob, prob))| {
        let logprob = logprob.or_else(|| prob.map(f64::log10))?;
        Some(TokenCandidate {
            rank,
            decoded_token: token.unwrap_or_default(),
            logprob,
        })
    }));
    candidates
}

fn ranked_candidate(key: &str, value: &Value) -> Option<TokenCandidate> {
    let fields = value.as_object()?;
    let rank = fields
        .get("rank")
        .and_then(Value::as_u64)
        .and_then(|r| u32::try_from(r).ok())
        .or_else(|| key.parse().ok())?;
    let logprob = fields.get("logprob").and_then(Value::as_f64)?;
    Some(TokenCandidate {
        rank,
        decoded_token: fields
            .get("decoded_token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        logprob,
    })
}

fn collect_flattened(by_rank: &mut BTreeMap<u32, FlatFields>, rest: &str, value: &Value) {
    let Some((rank, field)) = rest.split_once('_') else {
        return;
    };
    let Ok(rank) = rank.parse::<u32>() else {
        return;
    };
    let entry = by_rank.entry(rank).or_default();
    match field {
        "token" => entry.0 = value.as_str().map(str::to_string),
        "logprob" => entry.1 = value.as_f64(),
        "prob" => entry.2 = value.as_f64(),
        _ => {}
    }
}
