//! Plain-text rendering for terminal output. Every function returns lines
//! so callers decide where they go.

use crate::attention::{AttentionCell, AttentionReplay};
use crate::compare::{CategoryComparison, Divergence, QuestionDiff};
use crate::logprobs::NormalizedTokenLogprob;
use crate::model::EvalRecord;
use crate::sql_format::format_sql_text;
use crate::working_set::{fmt_pct, CategoryStats, OverallStats, WorkingSet, NO_VALUE};

fn pct_label(v: Option<f64>, places: usize) -> String {
    match v {
        Some(_) => format!("{}%", fmt_pct(v, places)),
        None => NO_VALUE.to_string(),
    }
}

#[must_use]
pub fn format_overall(overall: &OverallStats) -> String {
    format!(
        "Records: {}  Correct: {} ({})  Incorrect: {} ({})",
        overall.records,
        overall.correct,
        pct_label(overall.correct_pct, 3),
        overall.incorrect,
        pct_label(overall.incorrect_pct, 3),
    )
}

#[must_use]
pub fn format_category(stats: &CategoryStats) -> String {
    format!(
        "{:<24} {:>5} total  {:>5} correct  {:>5} incorrect  {:>4} exec errors  accuracy {}",
        stats.category, stats.total, stats.correct, stats.incorrect, stats.exec_errors,
        pct_label(stats.accuracy_pct, 2)
    )
}

pub fn summary_lines(ws: &WorkingSet) -> Vec<String> {
    let mut lines = vec![format_overall(&ws.overall())];
    lines.extend(ws.all_category_stats().iter().map(format_category));
    lines
}

/// One mark per record, correct first: `+` correct, `x` exec error, `-` wrong.
pub fn grid_line(ws: &WorkingSet, category: &str) -> String {
    ws.grid(category)
        .iter()
        .map(|r| {
            if r.is_correct() {
                '+'
            } else if r.has_exec_error() {
                'x'
            } else {
                '-'
            }
        })
        .collect()
}

pub fn record_lines(record: &EvalRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Question: {}", record.question),
        format!("Database: {} ({})", record.db_name, record.db_type),
        format!("Category: {}", record.query_category),
        format!("Correct: {}", if record.is_correct() { "yes" } else { "no" }),
    ];
    if let Some(instructions) = record.instructions.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Instructions: {instructions}"));
    }
    if record.has_exec_error() {
        lines.push(format!(
            "Execution error: {}",
            record.error_msg.as_deref().unwrap_or(NO_VALUE)
        ));
    }
    lines.push("Golden query:".to_string());
    lines.extend(indent(&format_sql_text(&record.query)));
    lines.push("Generated query:".to_string());
    lines.extend(indent(&format_sql_text(&record.generated_query)));
    lines
}

fn indent(block: &str) -> Vec<String> {
    block.lines().map(|l| format!("    {l}")).collect()
}

/// One line per decoding step: token, top-2 probabilities, gap and its color.
pub fn token_trace_lines(trace: &[NormalizedTokenLogprob]) -> Vec<String> {
    trace
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let d = step.detail();
            format!(
                "{:>4}  {:<20} {:>5}  {:<20} {:>5}  diff {:>5} {}",
                i,
                format!("{:?}", d.top_token),
                d.top_prob,
                format!("{:?}", d.second_token),
                d.second_prob,
                d.prob_diff,
                d.prob_diff_color
            )
        })
        .collect()
}

pub fn attention_lines(replay: &AttentionReplay) -> Vec<String> {
    if !replay.has_trace() {
        return vec!["No attention trace loaded.".to_string()];
    }
    let mut lines = vec![format!(
        "Step {}/{}  token: {}",
        replay.step(),
        replay.step_count().saturating_sub(1),
        replay.current_token().map_or(NO_VALUE.to_string(), |t| format!("{t:?}"))
    )];
    let mut current = String::new();
    for cell in replay.current_cells() {
        match cell {
            AttentionCell::LineBreak { count } => {
                lines.push(std::mem::take(&mut current));
                for _ in 1..count {
                    lines.push(String::new());
                }
            }
            AttentionCell::Token { token, title, color, .. } => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&format!("{token}[{title} {color}]"));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn comparison_lines(rows: &[CategoryComparison], diffs: &[QuestionDiff]) -> Vec<String> {
    let mut lines: Vec<String> = rows
        .iter()
        .map(|c| {
            format!(
                "{:<24} {:>7}  {:>7}  delta {}",
                c.category,
                c.left.accuracy_label(),
                c.right.accuracy_label(),
                fmt_pct(c.delta(), 2)
            )
        })
        .collect();
    for d in diffs {
        let tag = match d.kind {
            Divergence::Regressed => "regressed",
            Divergence::Fixed => "fixed",
        };
        lines.push(format!("  [{tag}] {}/{}: {}", d.db_name, d.category, d.question));
    }
    lines
}
