use evalviz_core::attention::{AttentionEntry, AttentionReplay, AttentionTrace};
use evalviz_core::color::{color_for, Domain, LIGHT_GREEN, PINK, YELLOW};
use evalviz_core::confidence::{min_top_prob, sequence_passes_threshold};
use evalviz_core::logprobs::normalize;
use evalviz_core::{build_working_set, EvalRecord, RawTokenLogprob, TokenCandidate};
use proptest::prelude::*;

fn step(logprobs: &[f64]) -> RawTokenLogprob {
    RawTokenLogprob::new(
        logprobs
            .iter()
            .enumerate()
            .map(|(i, lp)| TokenCandidate {
                rank: i as u32 + 1,
                decoded_token: format!("t{i}"),
                logprob: *lp,
            })
            .collect(),
    )
}

fn record(db: &str, question: &str, correct: bool, category: &str) -> EvalRecord {
    EvalRecord {
        question: question.to_string(),
        db_name: db.to_string(),
        db_type: "postgres".to_string(),
        query: String::new(),
        generated_query: String::new(),
        correct: u8::from(correct),
        error_db_exec: 0,
        error_msg: None,
        query_category: category.to_string(),
        instructions: None,
        prompt: None,
        logprobs: None,
    }
}

fn arb_record() -> impl Strategy<Value = EvalRecord> {
    ("[ab]{1,2}", "[a-cA-C]{0,3}", any::<bool>(), "[xyz]")
        .prop_map(|(db, q, c, cat)| record(&db, &q, c, &cat))
}

#[test]
fn color_anchor_points() {
    let d = Domain::PROBABILITY;
    assert_eq!(color_for(0.15, d), PINK.hex());
    assert_eq!(color_for(0.3, d), YELLOW.hex());
    assert_eq!(color_for(1.0, d), LIGHT_GREEN.hex());
}

#[test]
fn confidence_reference_values() {
    assert_eq!(min_top_prob(&[]), 1.0);
    assert_eq!(min_top_prob(&[step(&[0.0])]), 1.0);
    assert!((min_top_prob(&[step(&[-1.0])]) - 0.1).abs() < 1e-12);
    assert!(sequence_passes_threshold(&[step(&[f64::NEG_INFINITY])], 0.0));
    assert!(!sequence_passes_threshold(&[step(&[-0.001])], 0.0));
}

#[test]
fn end_to_end_threshold_scenario() {
    let mut r1 = record("a", "q1", false, "x");
    r1.logprobs = Some(vec![step(&[-1.0, -2.0])]);
    let mut r2 = record("a", "q2", true, "x");
    r2.logprobs = Some(vec![step(&[-0.01, -3.0])]);

    let ws = build_working_set(&[r1, r2], None, Some(0.5));
    assert_eq!(ws.records.len(), 1);
    assert_eq!(ws.records[0].question, "q1");
    assert_eq!(ws.category_stats("x").accuracy_pct, Some(0.0));
}

proptest! {
    #[test]
    fn color_clamps_outside_domain(v in -100.0f64..100.0) {
        let d = Domain::PROBABILITY;
        if v <= d.lo {
            prop_assert_eq!(color_for(v, d), PINK.hex());
        }
        if v >= d.hi {
            prop_assert_eq!(color_for(v, d), LIGHT_GREEN.hex());
        }
        let hex = color_for(v, d);
        prop_assert_eq!(hex.len(), 7);
        prop_assert!(hex.starts_with('#'));
    }

    #[test]
    fn min_top_prob_is_a_probability(lps in prop::collection::vec(-10.0f64..=0.0, 0..20)) {
        let trace: Vec<_> = lps.iter().map(|lp| step(&[*lp])).collect();
        let m = min_top_prob(&trace);
        prop_assert!((0.0..=1.0).contains(&m));
        prop_assert!(sequence_passes_threshold(&trace, 1.0));
    }

    #[test]
    fn prob_diff_matches_top_two(a in -5.0f64..=0.0, b in -5.0f64..=0.0) {
        let n = normalize(&[step(&[a, b])]);
        let expected = 10f64.powf(a) - 10f64.powf(b);
        prop_assert!((n[0].prob_diff().unwrap() - expected).abs() < 1e-12);
        prop_assert!(n[0].prob(1).unwrap() > 0.0);
    }

    #[test]
    fn working_set_is_sorted_and_counts_add_up(
        records in prop::collection::vec(arb_record(), 0..30),
    ) {
        let ws = build_working_set(&records, None, None);
        prop_assert_eq!(ws.records.len(), records.len());
        for w in ws.records.windows(2) {
            prop_assert!(
                (w[0].db_name.as_str(), w[0].question.as_str())
                    <= (w[1].db_name.as_str(), w[1].question.as_str())
            );
        }
        let total: usize = ws.all_category_stats().iter().map(|c| c.total).sum();
        prop_assert_eq!(total, ws.records.len());
        for c in ws.all_category_stats() {
            prop_assert_eq!(c.correct + c.incorrect, c.total);
            let acc = c.accuracy_pct.unwrap();
            prop_assert!((0.0..=100.0).contains(&acc));
        }
    }

    #[test]
    fn replay_step_stays_in_range(n in 0usize..12, requested in -50i64..50) {
        let mut replay = AttentionReplay::default();
        let steps = (0..n)
            .map(|i| {
                (0..i)
                    .map(|j| AttentionEntry { token: format!("t{j}"), attn_weight: 1.0 })
                    .collect()
            })
            .collect();
        replay.load(AttentionTrace::new(steps));
        let s = replay.set_step(requested);
        prop_assert!(s <= n.saturating_sub(1));
        prop_assert_eq!(replay.current_token().is_none(), s == 0 || n <= 1);
    }
}
