//! Step-by-step replay of attention weights over a generation.
//!
//! A trace maps step indices `0..N-1` to the token/weight pairs of the
//! context window at that step. The replay controller is a cursor over those
//! steps; out-of-range requests are clamped.

use crate::color::{color_for, Domain};
use crate::errors::EvalError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionEntry {
    pub token: String,
    #[serde(rename = "attn", alias = "attn_weight", alias = "attnWeight")]
    pub attn_weight: f64,
}

pub type AttentionStep = Vec<AttentionEntry>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttentionTrace {
    steps: Vec<AttentionStep>,
}

impl AttentionTrace {
    pub fn new(steps: Vec<AttentionStep>) -> Self {
        Self { steps }
    }

    /// Builds a trace from the wire mapping (`"0"`, `"1"`, ...). Keys must be
    /// contiguous integers starting at zero.
    pub fn from_activations(map: HashMap<String, AttentionStep>) -> Result<Self, EvalError> {
        let mut indexed = Vec::with_capacity(map.len());
        for (key, step) in map {
            let idx: usize = key.trim().parse().map_err(|_| {
                EvalError::MalformedTrace(format!("step key '{key}' is not an integer"))
            })?;
            indexed.push((idx, step));
        }
        indexed.sort_by_key(|(idx, _)| *idx);
        for (expected, (idx, _)) in indexed.iter().enumerate() {
            if *idx != expected {
                return Err(EvalError::MalformedTrace(format!(
                    "step keys are not contiguous: expected {expected}, found {idx}"
                )));
            }
        }
        Ok(Self::new(indexed.into_iter().map(|(_, s)| s).collect()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, idx: usize) -> Option<&AttentionStep> {
        self.steps.get(idx)
    }

    /// Tokens produced by the generation: the last step's tokens, trimmed to
    /// the final `N-1` entries. Empty when `N <= 1`.
    pub fn decoded_tokens(&self) -> Vec<&str> {
        let generated = self.steps.len().saturating_sub(1);
        let Some(last) = self.steps.last() else {
            return Vec::new();
        };
        let start = last.len().saturating_sub(generated);
        last[start..].iter().map(|e| e.token.as_str()).collect()
    }

    /// Token generated at `step`; step 0 has none.
    pub fn decoded_token(&self, step: usize) -> Option<&str> {
        if step == 0 {
            return None;
        }
        self.decoded_tokens().get(step - 1).copied()
    }
}

/// One cell of the attention view at a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttentionCell {
    LineBreak {
        count: usize,
    },
    Token {
        token: String,
        weight: f64,
        title: String,
        color: String,
    },
}

pub fn render_step(step: &AttentionStep, domain: Domain) -> Vec<AttentionCell> {
    step.iter()
        .map(|e| match e.token.as_str() {
            "\n" => AttentionCell::LineBreak { count: 1 },
            "\n\n" => AttentionCell::LineBreak { count: 2 },
            _ => AttentionCell::Token {
                token: e.token.clone(),
                weight: e.attn_weight,
                title: format!("{:.2}", e.attn_weight),
                color: color_for(e.attn_weight, domain),
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReplayState {
    /// Nothing loaded, or the last load failed / returned no data.
    #[default]
    NoTrace,
    Loading,
    Ready { trace: AttentionTrace, step: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttentionReplay {
    state: ReplayState,
    domain: Domain,
}

impl Default for AttentionReplay {
    fn default() -> Self {
        Self::new(Domain::ATTENTION)
    }
}

impl AttentionReplay {
    pub fn new(domain: Domain) -> Self {
        Self {
            state: ReplayState::NoTrace,
            domain,
        }
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn has_trace(&self) -> bool {
        matches!(self.state, ReplayState::Ready { .. })
    }

    pub fn set_loading(&mut self) {
        self.state = ReplayState::Loading;
    }

    pub fn clear(&mut self) {
        self.state = ReplayState::NoTrace;
    }

    /// Installs a trace and rewinds to step 0.
    pub fn load(&mut self, trace: AttentionTrace) {
        self.state = ReplayState::Ready { trace, step: 0 };
    }

    pub fn trace(&self) -> Option<&AttentionTrace> {
        match &self.state {
            ReplayState::Ready { trace, .. } => Some(trace),
            _ => None,
        }
    }

    pub fn step(&self) -> usize {
        match &self.state {
            ReplayState::Ready { step, .. } => *step,
            _ => 0,
        }
    }

    pub fn step_count(&self) -> usize {
        self.trace().map_or(0, AttentionTrace::len)
    }

    /// Moves to `requested`, clamped into `[0, N-1]`. Returns the new step.
    pub fn set_step(&mut self, requested: i64) -> usize {
        if let ReplayState::Ready { trace, step } = &mut self.state {
            let max = trace.len().saturating_sub(1) as i64;
            *step = requested.clamp(0, max) as usize;
            *step
        } else {
            0
        }
    }

    pub fn next(&mut self) -> usize {
        self.set_step(self.step() as i64 + 1)
    }

    pub fn prev(&mut self) -> usize {
        self.set_step(self.step() as i64 - 1)
    }

    pub fn current_token(&self) -> Option<&str> {
        self.trace().and_then(|t| t.decoded_token(self.step()))
    }

    pub fn current_cells(&self) -> Vec<AttentionCell> {
        self.trace()
            .and_then(|t| t.step(self.step()))
            .map(|s| render_step(s, self.domain))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(token: &str, w: f64) -> AttentionEntry {
        AttentionEntry {
            token: token.into(),
            attn_weight: w,
        }
    }

    /// Step i holds the prompt plus the first i generated tokens.
    fn trace(n: usize) -> AttentionTrace {
        let prompt = vec![entry("Q", 0.4), entry(":", 0.6)];
        let steps = (0..n)
            .map(|i| {
                let mut s = prompt.clone();
                s.extend((0..i).map(|j| entry(&format!("t{}", j + 1), 1.0)));
                s
            })
            .collect();
        AttentionTrace::new(steps)
    }

    #[test]
    fn set_step_clamps_both_ways() {
        let mut r = AttentionReplay::default();
        r.load(trace(10));
        assert_eq!(r.set_step(-5), 0);
        assert_eq!(r.set_step(999), 9);
        assert_eq!(r.prev(), 8);
        assert_eq!(r.next(), 9);
        assert_eq!(r.next(), 9);
    }

    #[test]
    fn reload_rewinds() {
        let mut r = AttentionReplay::default();
        r.load(trace(4));
        r.set_step(3);
        r.load(trace(4));
        assert_eq!(r.step(), 0);
    }

    #[test]
    fn decoded_tokens_come_from_last_step_tail() {
        let t = trace(4);
        assert_eq!(t.decoded_tokens(), vec!["t1", "t2", "t3"]);
        assert_eq!(t.decoded_token(0), None);
        assert_eq!(t.decoded_token(1), Some("t1"));
        assert_eq!(t.decoded_token(3), Some("t3"));
        assert_eq!(t.decoded_token(4), None);
    }

    #[test]
    fn single_step_has_no_decoded_tokens() {
        assert!(trace(1).decoded_tokens().is_empty());
        assert!(AttentionTrace::default().decoded_tokens().is_empty());
    }

    #[test]
    fn no_trace_differs_from_empty_trace() {
        let mut r = AttentionReplay::default();
        assert_eq!(r.state(), &ReplayState::NoTrace);
        r.load(AttentionTrace::default());
        assert!(r.has_trace());
        assert_eq!(r.step_count(), 0);
        assert_eq!(r.set_step(3), 0);
        assert!(r.current_cells().is_empty());
    }

    #[test]
    fn rejects_gaps_in_step_keys() {
        let mut map = HashMap::new();
        map.insert("0".to_string(), vec![]);
        map.insert("2".to_string(), vec![]);
        assert!(matches!(
            AttentionTrace::from_activations(map),
            Err(EvalError::MalformedTrace(_))
        ));
    }

    #[test]
    fn renders_newlines_as_breaks() {
        let step = vec![entry("SELECT", 2.5), entry("\n", 0.1), entry("\n\n", 0.1)];
        let cells = render_step(&step, Domain::ATTENTION);
        assert_eq!(
            cells[0],
            AttentionCell::Token {
                token: "SELECT".into(),
                weight: 2.5,
                title: "2.50".into(),
                color: "#90ee90".into(),
            }
        );
        assert_eq!(cells[1], AttentionCell::LineBreak { count: 1 });
        assert_eq!(cells[2], AttentionCell::LineBreak { count: 2 });
    }

    #[test]
    fn parses_wire_field_name() {
        let e: AttentionEntry = serde_json::from_str(r#"{"token": "a", "attn": 0.7}"#).unwrap();
        assert_eq!(e.attn_weight, 0.7);
    }
}
