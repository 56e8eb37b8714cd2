use crate::logprobs::to_prob;
use crate::model::RawTokenLogprob;

/// Smallest rank-1 probability across the trace. An empty trace is 1.0
/// (fully confident / unknown); steps without a rank-1 candidate are skipped.
pub fn min_top_prob(trace: &[RawTokenLogprob]) -> f64 {
    trace
        .iter()
        .filter_map(|step| step.top())
        .map(|top| to_prob(top.logprob))
        .fold(1.0, f64::min)
}

/// True when the weakest step is at or below `threshold`, i.e. the trace
/// contains at least one low-confidence token.
pub fn sequence_passes_threshold(trace: &[RawTokenLogprob], threshold: f64) -> bool {
    min_top_prob(trace) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenCandidate;

    fn top(logprob: f64) -> RawTokenLogprob {
        RawTokenLogprob::new(vec![TokenCandidate {
            rank: 1,
            decoded_token: "t".into(),
            logprob,
        }])
    }

    #[test]
    fn empty_trace_is_fully_confident() {
        assert_eq!(min_top_prob(&[]), 1.0);
    }

    #[test]
    fn single_step_values() {
        assert_eq!(min_top_prob(&[top(0.0)]), 1.0);
        assert!((min_top_prob(&[top(-1.0)]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn takes_the_weakest_step() {
        let trace = vec![top(-0.1), top(-2.0), top(-0.5)];
        assert!((min_top_prob(&trace) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn threshold_one_keeps_everything() {
        assert!(sequence_passes_threshold(&[top(0.0)], 1.0));
        assert!(sequence_passes_threshold(&[top(-0.3), top(-5.0)], 1.0));
    }

    #[test]
    fn threshold_zero_needs_a_zero_probability_step() {
        assert!(!sequence_passes_threshold(&[top(-50.0)], 0.0));
        assert!(sequence_passes_threshold(
            &[top(-0.1), top(f64::NEG_INFINITY)],
            0.0
        ));
    }

    #[test]
    fn step_without_rank_one_is_ignored() {
        let only_second = RawTokenLogprob::new(vec![TokenCandidate {
            rank: 2,
            decoded_token: "x".into(),
            logprob: -3.0,
        }]);
        assert_eq!(min_top_prob(&[only_second]), 1.0);
    }
}
