use serde::{Deserialize, Serialize};

/// Identifier convention used to render a token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Convention {
    /// `testCaseStartNow`
    Camel,
    /// `TestCaseStartNow`
    #[serde(alias = "caps")]
    Pascal,
    /// `test-case-start-now`
    Dash,
    /// `test_case_start_now`
    Snake,
    /// `TEST_CASE_START_NOW`
    UpperSnake,
    /// `testcasestartnow`
    Concat,
    /// `test case start now`
    Verbatim,
    /// `Test case start now`
    Sentence,
    /// `TEST CASE START NOW`
    Upper,
}

/// Spoken names for each convention, used to build the format commands.
/// Order matters only for display; phrases must be unique.
pub const FORMATTERS: &[(&str, Convention)] = &[
    ("camel", Convention::Camel),
    ("caps", Convention::Pascal),
    ("dash", Convention::Dash),
    ("score", Convention::Snake),
    ("upper score", Convention::UpperSnake),
    ("word", Convention::Concat),
    ("say", Convention::Verbatim),
    ("phrase", Convention::Sentence),
    ("upper", Convention::Upper),
];

/// Upper-case the first character, leave the rest untouched.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn camel(tokens: &[String]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i == 0 {
            out.push_str(token);
        } else {
            out.push_str(&capitalize(token));
        }
    }
    out
}

/// Render `tokens` in the given convention.
pub fn format(tokens: &[String], convention: Convention) -> String {
    match convention {
        Convention::Camel => camel(tokens),
        Convention::Pascal => tokens.iter().map(|t| capitalize(t)).collect(),
        Convention::Dash => tokens.join("-"),
        Convention::Snake => tokens.join("_"),
        Convention::UpperSnake => tokens
            .iter()
            .map(|t| t.to_uppercase())
            .collect::<Vec<_>>()
            .join("_"),
        Convention::Concat => tokens.concat(),
        Convention::Verbatim => tokens.join(" "),
        Convention::Sentence => {
            let mut words: Vec<String> = tokens.to_vec();
            if let Some(first) = words.first_mut() {
                *first = capitalize(first);
            }
            words.join(" ")
        }
        Convention::Upper => tokens
            .iter()
            .map(|t| t.to_uppercase())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Fill a two-slot template: both token lists are camel-cased on their own
/// and joined by the fixed literals, e.g. `foreach (var ` + x + ` in ` + y + `)`.
pub fn format_two(
    first: &[String],
    second: &[String],
    prefix: &str,
    middle: &str,
    suffix: &str,
) -> String {
    format!("{prefix}{}{middle}{}{suffix}", camel(first), camel(second))
}
