//! Display formatting for gold and generated SQL.
//!
//! `format_sql_text` never fails: anything it cannot lay out (unbalanced
//! quotes or parentheses) is returned with only the placeholder braces
//! removed.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r#"(?s)'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|\w+|\s+|."#)
            .expect("static regex");
}

/// Removes `{`/`}` template delimiters, keeping the placeholder names.
pub fn strip_placeholders(sql: &str) -> String {
    sql.chars().filter(|c| *c != '{' && *c != '}').collect()
}

pub fn format_sql_text(sql: &str) -> String {
    if sql.is_empty() {
        return String::new();
    }
    let stripped = strip_placeholders(sql);
    layout(&stripped).unwrap_or(stripped)
}

#[derive(Debug)]
struct Tok<'a> {
    text: &'a str,
    space_before: bool,
}

impl Tok<'_> {
    fn is_word(&self) -> bool {
        self.text
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Clause,
    Join,
}

const KEYWORDS: &[(&[&str], Kind)] = &[
    (&["GROUP", "BY"], Kind::Clause),
    (&["ORDER", "BY"], Kind::Clause),
    (&["UNION", "ALL"], Kind::Clause),
    (&["UNION"], Kind::Clause),
    (&["WITH"], Kind::Clause),
    (&["SELECT"], Kind::Clause),
    (&["FROM"], Kind::Clause),
    (&["WHERE"], Kind::Clause),
    (&["HAVING"], Kind::Clause),
    (&["LIMIT"], Kind::Clause),
    (&["OFFSET"], Kind::Clause),
    (&["LEFT", "OUTER", "JOIN"], Kind::Join),
    (&["RIGHT", "OUTER", "JOIN"], Kind::Join),
    (&["FULL", "OUTER", "JOIN"], Kind::Join),
    (&["LEFT", "JOIN"], Kind::Join),
    (&["RIGHT", "JOIN"], Kind::Join),
    (&["FULL", "JOIN"], Kind::Join),
    (&["INNER", "JOIN"], Kind::Join),
    (&["CROSS", "JOIN"], Kind::Join),
    (&["JOIN"], Kind::Join),
];

fn tokenize(sql: &str) -> Option<Vec<Tok<'_>>> {
    let mut toks = Vec::new();
    let mut space_before = false;
    for m in TOKEN.find_iter(sql) {
        let text = m.as_str();
        if text.trim().is_empty() {
            space_before = true;
            continue;
        }
        if text == "'" || text == "\"" {
            return None;
        }
        toks.push(Tok { text, space_before });
        space_before = false;
    }
    Some(toks)
}

fn keyword_at(toks: &[Tok<'_>], i: usize) -> Option<(&'static [&'static str], Kind)> {
    KEYWORDS.iter().copied().find(|(words, _)| {
        words.iter().enumerate().all(|(k, w)| {
            toks.get(i + k)
                .is_some_and(|t| t.is_word() && t.text.eq_ignore_ascii_case(w))
        })
    })
}

fn layout(sql: &str) -> Option<String> {
    let toks = tokenize(sql)?;
    let mut out = String::new();
    let mut depth: i32 = 0;
    let mut line_start = true;
    let mut i = 0;

    while i < toks.len() {
        let tok = &toks[i];

        if depth == 0 && tok.is_word() {
            if let Some((words, kind)) = keyword_at(&toks, i) {
                if !out.is_empty() {
                    out.push('\n');
                }
                match kind {
                    Kind::Clause => {
                        out.push_str(&words.join(" "));
                        out.push_str("\n  ");
                        line_start = true;
                    }
                    Kind::Join => {
                        out.push_str("  ");
                        out.push_str(&words.join(" "));
                        line_start = false;
                    }
                }
                i += words.len();
                continue;
            }
        }

        match tok.text {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }

        if tok.text == "," && depth == 0 {
            out.push_str(",\n  ");
            line_start = true;
            i += 1;
            continue;
        }

        if tok.space_before && !line_start {
            out.push(' ');
        }
        out.push_str(tok.text);
        line_start = false;

        if tok.text.starts_with("--") {
            out.push_str("\n  ");
            line_start = true;
        }
        i += 1;
    }

    if depth != 0 {
        return None;
    }

    Some(
        out.lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
