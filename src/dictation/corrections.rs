use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dictionary-based fixer for words the recognizer keeps getting wrong.
///
/// Matching is case-insensitive and only hits whole words, so "git" never
/// rewrites the middle of "digit". Longer phrases are applied first.
/// The replacement text is inserted as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct TextCorrector {
    replacements: HashMap<String, String>,
    /// Compiled matchers, longest phrase first
    compiled: Vec<(Regex, String)>,
}

impl TextCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(replacements: HashMap<String, String>) -> Self {
        let mut corrector = Self {
            replacements,
            compiled: Vec::new(),
        };
        corrector.rebuild();
        corrector
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn correct(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, replacement) in &self.compiled {
            result = pattern
                .replace_all(&result, NoExpand(replacement))
                .into_owned();
        }
        result
    }

    pub fn add(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.replacements.insert(from.into(), to.into());
        self.rebuild();
    }

    pub const fn replacements(&self) -> &HashMap<String, String> {
        &self.replacements
    }

    fn rebuild(&mut self) {
        let mut keys: Vec<&String> = self
            .replacements
            .keys()
            .filter(|k| !k.trim().is_empty())
            .collect();
        // Longest first, then alphabetical so equal lengths are deterministic
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self.compiled = keys
            .into_iter()
            .filter_map(|key| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(key.trim()));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, self.replacements[key].clone())),
                    Err(e) => {
                        tracing::warn!(phrase = %key, "skipping correction: {e}");
                        None
                    }
                }
            })
            .collect();
    }
}

impl From<HashMap<String, String>> for TextCorrector {
    fn from(map: HashMap<String, String>) -> Self {
        Self::from_map(map)
    }
}

impl From<TextCorrector> for HashMap<String, String> {
    fn from(corrector: TextCorrector) -> Self {
        corrector.replacements
    }
}
