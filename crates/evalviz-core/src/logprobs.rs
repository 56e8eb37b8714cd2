//! Per-token ranked candidates with base-10 probabilities.
//!
//! Logprobs in eval datasets are base-10 (`prob = 10^logprob`), not natural
//! log likelihoods.

use crate::color::{color_for_opt, Domain};
use crate::model::RawTokenLogprob;
use crate::working_set::NO_VALUE;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedToken {
    pub rank: u32,
    pub token: String,
    pub logprob: f64,
    pub prob: f64,
}

/// One decoding step after normalization. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTokenLogprob {
    ranks: Vec<RankedToken>,
    prob_diff: Option<f64>,
}

impl NormalizedTokenLogprob {
    pub fn from_raw(step: &RawTokenLogprob) -> Self {
        let ranks: Vec<RankedToken> = step
            .candidates()
            .iter()
            .map(|c| RankedToken {
                rank: c.rank,
                token: c.decoded_token.clone(),
                logprob: c.logprob,
                prob: to_prob(c.logprob),
            })
            .collect();

        let prob_of = |rank: u32| ranks.iter().find(|t| t.rank == rank).map(|t| t.prob);
        let prob_diff = match (prob_of(1), prob_of(2)) {
            (Some(p1), Some(p2)) => Some(p1 - p2),
            _ => None,
        };

        Self { ranks, prob_diff }
    }

    pub fn ranks(&self) -> &[RankedToken] {
        &self.ranks
    }

    pub fn rank(&self, rank: u32) -> Option<&RankedToken> {
        self.ranks.iter().find(|t| t.rank == rank)
    }

    pub fn token(&self, rank: u32) -> Option<&str> {
        self.rank(rank).map(|t| t.token.as_str())
    }

    pub fn prob(&self, rank: u32) -> Option<f64> {
        self.rank(rank).map(|t| t.prob)
    }

    pub fn logprob(&self, rank: u32) -> Option<f64> {
        self.rank(rank).map(|t| t.logprob)
    }

    /// `prob_1 - prob_2`; `None` unless both ranks are present.
    pub fn prob_diff(&self) -> Option<f64> {
        self.prob_diff
    }

    /// Background color of the token in the trace view.
    pub fn color(&self) -> String {
        color_for_opt(self.prob(1), Domain::PROBABILITY)
    }

    pub fn detail(&self) -> TokenDetail {
        TokenDetail::from_step(self)
    }
}

/// Base-10 probability of a logprob.
pub fn to_prob(logprob: f64) -> f64 {
    10f64.powf(logprob)
}

pub fn normalize(trace: &[RawTokenLogprob]) -> Vec<NormalizedTokenLogprob> {
    trace.iter().map(NormalizedTokenLogprob::from_raw).collect()
}

/// Hover card for one token: the top two candidates and their gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenDetail {
    pub top_token: String,
    pub top_prob: String,
    pub second_token: String,
    pub second_prob: String,
    pub prob_diff: String,
    pub prob_diff_color: String,
}

impl TokenDetail {
    pub fn from_step(step: &NormalizedTokenLogprob) -> Self {
        let fmt_prob = |p: Option<f64>| p.map_or_else(|| NO_VALUE.to_string(), |p| format!("{p:.2}"));
        let fmt_token = |t: Option<&str>| t.unwrap_or(NO_VALUE).to_string();
        Self {
            top_token: fmt_token(step.token(1)),
            top_prob: fmt_prob(step.prob(1)),
            second_token: fmt_token(step.token(2)),
            second_prob: fmt_prob(step.prob(2)),
            prob_diff: fmt_prob(step.prob_diff()),
            prob_diff_color: color_for_opt(step.prob_diff(), Domain::PROBABILITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenCandidate;

    fn step(cands: &[(u32, &str, f64)]) -> RawTokenLogprob {
        RawTokenLogprob::new(
            cands
                .iter()
                .map(|(rank, tok, lp)| TokenCandidate {
                    rank: *rank,
                    decoded_token: (*tok).to_string(),
                    logprob: *lp,
                })
                .collect(),
        )
    }

    #[test]
    fn uses_base_ten() {
        let n = NormalizedTokenLogprob::from_raw(&step(&[(1, "SELECT", -1.0)]));
        assert!((n.prob(1).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(n.logprob(1), Some(-1.0));
    }

    #[test]
    fn prob_diff_is_exact_difference() {
        let n = NormalizedTokenLogprob::from_raw(&step(&[(1, "a", -0.2), (2, "b", -0.9)]));
        let p1 = 10f64.powf(-0.2);
        let p2 = 10f64.powf(-0.9);
        assert!(p1 >= p2);
        assert_eq!(n.prob_diff(), Some(p1 - p2));
    }

    #[test]
    fn missing_second_rank_leaves_diff_absent() {
        let n = NormalizedTokenLogprob::from_raw(&step(&[(1, "a", 0.0)]));
        assert_eq!(n.prob_diff(), None);
        let d = n.detail();
        assert_eq!(d.top_prob, "1.00");
        assert_eq!(d.second_token, "—");
        assert_eq!(d.prob_diff, "—");
        assert_eq!(d.prob_diff_color, "#ffc0cb");
    }

    #[test]
    fn normalize_preserves_step_order() {
        let trace = vec![step(&[(1, "SELECT", -0.01)]), step(&[(1, "*", -0.5)])];
        let out = normalize(&trace);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].token(1), Some("SELECT"));
        assert_eq!(out[1].token(1), Some("*"));
    }
}
