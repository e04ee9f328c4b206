//! Window-state predicates deciding which rule set is live.
//!
//! A `Context` is plain data so it can live in vocabulary files. The
//! combinators flatten as they go, so a deep environment tree produces a
//! shallow `And` rather than a nested chain.

use serde::{Deserialize, Serialize};

/// Metadata of the foreground window, supplied by the host integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Executable path or name of the owning process
    #[serde(default)]
    pub executable: String,
    #[serde(default)]
    pub title: String,
}

impl WindowInfo {
    pub fn new(executable: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            title: title.into(),
        }
    }
}

/// Boolean predicate over `WindowInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Context {
    /// Matches every window. Identity element of `and`.
    #[default]
    Any,
    /// Executable path contains `name` (case-insensitive)
    Executable { name: String },
    /// Window title contains `contains` (case-insensitive)
    Title { contains: String },
    And { all: Vec<Context> },
    Not { inner: Box<Context> },
}

impl Context {
    pub fn executable(name: impl Into<String>) -> Self {
        Self::Executable { name: name.into() }
    }

    pub fn title(contains: impl Into<String>) -> Self {
        Self::Title {
            contains: contains.into(),
        }
    }

    /// Conjunction of `predicates`. `Any` operands are dropped and nested
    /// conjunctions are flattened.
    pub fn and(predicates: impl IntoIterator<Item = Context>) -> Self {
        let mut all = Vec::new();
        for predicate in predicates {
            match predicate {
                Context::Any => {}
                Context::And { all: inner } => all.extend(inner),
                other => all.push(other),
            }
        }
        match all.len() {
            0 => Context::Any,
            1 => all.pop().unwrap_or_default(),
            _ => Context::And { all },
        }
    }

    /// Negation. Double negation collapses.
    pub fn not(predicate: Context) -> Self {
        match predicate {
            Context::Not { inner } => *inner,
            other => Context::Not {
                inner: Box::new(other),
            },
        }
    }

    pub fn matches(&self, window: &WindowInfo) -> bool {
        match self {
            Context::Any => true,
            Context::Executable { name } => window
                .executable
                .to_lowercase()
                .contains(&name.to_lowercase()),
            Context::Title { contains } => window
                .title
                .to_lowercase()
                .contains(&contains.to_lowercase()),
            Context::And { all } => all.iter().all(|c| c.matches(window)),
            Context::Not { inner } => !inner.matches(window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> WindowInfo {
        WindowInfo::new(r"C:\Program Files\Google\Chrome\chrome.exe", "Inbox - Google Chrome")
    }

    #[test]
    fn any_matches_everything() {
        assert!(Context::Any.matches(&chrome()));
        assert!(Context::Any.matches(&WindowInfo::default()));
    }

    #[test]
    fn executable_and_title_are_case_insensitive_substrings() {
        assert!(Context::executable("Chrome").matches(&chrome()));
        assert!(Context::title(" - google chrome").matches(&chrome()));
        assert!(!Context::executable("slack").matches(&chrome()));
    }

    #[test]
    fn and_with_any_is_identity() {
        let c = Context::executable("chrome");
        assert_eq!(Context::and([Context::Any, c.clone()]), c);
        assert_eq!(Context::and([c.clone(), Context::Any]), c);
        assert_eq!(Context::and([Context::Any, Context::Any]), Context::Any);
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let a = Context::executable("a");
        let b = Context::title("b");
        let c = Context::title("c");
        let ab = Context::and([a.clone(), b.clone()]);
        let abc = Context::and([ab, c.clone()]);
        assert_eq!(abc, Context::And { all: vec![a, b, c] });
    }

    #[test]
    fn not_inverts_and_collapses() {
        let c = Context::executable("chrome");
        let not_c = Context::not(c.clone());
        assert!(!not_c.matches(&chrome()));
        assert_eq!(Context::not(not_c), c);
    }

    #[test]
    fn not_any_matches_nothing() {
        let never = Context::not(Context::Any);
        assert!(!never.matches(&chrome()));
        assert!(!never.matches(&WindowInfo::default()));
    }

    #[test]
    fn deserializes_tagged_form() {
        let json = r#"{"type":"and","all":[{"type":"executable","name":"code"},{"type":"not","inner":{"type":"title","contains":"Settings"}}]}"#;
        let c: Context = serde_json::from_str(json).unwrap();
        assert!(c.matches(&WindowInfo::new("code.exe", "main.rs")));
        assert!(!c.matches(&WindowInfo::new("code.exe", "Settings")));
    }
}
