//! Named sub-grammar elements referenced from phrase patterns as `<name>`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value captured by an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Text(t) => t.clone(),
        }
    }
}

/// Named values bound by a match, consumed by action templates.
pub type Extras = BTreeMap<String, Value>;

/// Placeholder name → element definition.
pub type ElementMap = BTreeMap<String, ElementDef>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Integer in `min..max` (max exclusive), spoken as digits or number words
    Integer { min: i64, max: i64 },
    /// Free text: one or more arbitrary words
    Dictation,
    /// One entry from a spoken-form → value table
    Choice { choices: BTreeMap<String, String> },
    /// `min..=max` entries from a table, values joined by `separator`
    Repetition {
        choices: BTreeMap<String, String>,
        min: usize,
        max: usize,
        #[serde(default)]
        separator: String,
    },
    Alternative { options: Vec<Element> },
}

/// An element plus the value used when its optional slot was not spoken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDef {
    pub element: Element,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ElementDef {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            default: None,
        }
    }

    pub fn with_default(element: Element, default: Value) -> Self {
        Self {
            element,
            default: Some(default),
        }
    }
}

const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty",
];

const TENS_WORDS: &[(&str, i64)] = &[
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
    ("hundred", 100),
];

fn parse_number(word: &str) -> Option<i64> {
    if let Ok(n) = word.parse::<i64>() {
        return Some(n);
    }
    let lower = word.to_lowercase();
    if let Some(n) = NUMBER_WORDS.iter().position(|w| *w == lower) {
        return Some(n as i64);
    }
    TENS_WORDS
        .iter()
        .find(|(w, _)| *w == lower)
        .map(|(_, n)| *n)
}

/// Does `words` begin with the spoken form `key`?
fn starts_with_phrase(words: &[String], key: &str) -> Option<usize> {
    let key_words: Vec<&str> = key.split_whitespace().collect();
    if key_words.is_empty() || key_words.len() > words.len() {
        return None;
    }
    key_words
        .iter()
        .zip(words)
        .all(|(k, w)| k.eq_ignore_ascii_case(w))
        .then_some(key_words.len())
}

fn choice_candidates(choices: &BTreeMap<String, String>, words: &[String]) -> Vec<(usize, String)> {
    let mut out: Vec<(usize, String)> = choices
        .iter()
        .filter_map(|(key, value)| starts_with_phrase(words, key).map(|len| (len, value.clone())))
        .collect();
    out.sort_by(|a, b| b.0.cmp(&a.0));
    out
}

impl Element {
    /// Every way this element can match a prefix of `words`, as
    /// `(words consumed, value)`, preferring longer matches.
    pub(crate) fn candidates(&self, words: &[String]) -> Vec<(usize, Value)> {
        match self {
            Element::Integer { min, max } => words
                .first()
                .and_then(|w| parse_number(w))
                .filter(|n| n >= min && n < max)
                .map(|n| vec![(1, Value::Int(n))])
                .unwrap_or_default(),
            Element::Dictation => (1..=words.len())
                .rev()
                .map(|len| (len, Value::Text(words[..len].join(" "))))
                .collect(),
            Element::Choice { choices } => choice_candidates(choices, words)
                .into_iter()
                .map(|(len, v)| (len, Value::Text(v)))
                .collect(),
            Element::Repetition {
                choices,
                min,
                max,
                separator,
            } => {
                let mut found = Vec::new();
                repeat_candidates(choices, words, 0, *min, *max, &mut Vec::new(), &mut found);
                found.sort_by(|a, b| b.0.cmp(&a.0));
                found
                    .into_iter()
                    .map(|(len, parts)| (len, Value::Text(parts.join(separator))))
                    .collect()
            }
            Element::Alternative { options } => {
                let mut out: Vec<(usize, Value)> =
                    options.iter().flat_map(|o| o.candidates(words)).collect();
                out.sort_by(|a, b| b.0.cmp(&a.0));
                out
            }
        }
    }
}

fn repeat_candidates(
    choices: &BTreeMap<String, String>,
    words: &[String],
    consumed: usize,
    min: usize,
    max: usize,
    parts: &mut Vec<String>,
    found: &mut Vec<(usize, Vec<String>)>,
) {
    if parts.len() >= min {
        found.push((consumed, parts.clone()));
    }
    if parts.len() == max {
        return;
    }
    for (len, value) in choice_candidates(choices, &words[consumed..]) {
        parts.push(value);
        repeat_candidates(choices, words, consumed + len, min, max, parts, found);
        parts.pop();
    }
}
