//! Error types shared across the command pipeline.
//!
//! Configuration problems (`ConfigError`, `PatternError`) surface at install
//! time and stop the engine from starting. Everything else is per-utterance:
//! the failing utterance is dropped and the next one is processed normally.

use thiserror::Error;

/// A phrase pattern that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unbalanced '{0}' in pattern")]
    Unbalanced(char),
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("empty slot name at offset {0}")]
    EmptySlot(usize),
    #[error("pattern has an empty alternative")]
    EmptyAlternative,
}

/// Raised while building rules from the command tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{rule}: invalid pattern {pattern:?}: {source}")]
    Pattern {
        rule: String,
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("{rule}: pattern {pattern:?} references unknown element <{name}>")]
    UnknownElement {
        rule: String,
        pattern: String,
        name: String,
    },
    #[error("{rule}: action for {pattern:?} uses undefined placeholder {{{name}}}")]
    UnknownPlaceholder {
        rule: String,
        pattern: String,
        name: String,
    },
    #[error("{rule}: action for {pattern:?} uses {{{name}}}, but <{name}> is optional and has no default")]
    OptionalPlaceholder {
        rule: String,
        pattern: String,
        name: String,
    },
    #[error("{rule}: action for {pattern:?} has an invalid key spec: {source}")]
    Action {
        rule: String,
        pattern: String,
        #[source]
        source: ActionError,
    },
    #[error("rule {0} is already registered")]
    DuplicateRule(String),
    #[error("rules cannot be added while the engine is running")]
    EngineRunning,
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Failure while turning an action into input events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
    #[error("unknown modifier {0:?}")]
    UnknownModifier(char),
    #[error("invalid key element {0:?}")]
    InvalidKeySpec(String),
    #[error("invalid mouse spec {0:?}")]
    InvalidMouseSpec(String),
    #[error("no value bound for {{{0}}}")]
    MissingExtra(String),
    #[error("backend rejected input: {0}")]
    Backend(#[from] BackendError),
}

/// The input-injection backend refused or failed to deliver an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("injection rejected: {0}")]
    Rejected(String),
    #[error("output closed: {0}")]
    Io(String),
}

/// An utterance that cannot be turned into a `Recognition`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("repeat count {count} outside 1..={max}")]
    RepeatOutOfRange { count: u32, max: u32 },
    #[error("sequence of {len} commands exceeds the limit of {max}")]
    SequenceTooLong { len: usize, max: usize },
    #[error("dictation commands cannot be combined with a terminal command")]
    DictationWithTerminal,
    #[error("{rule}: no command matches {phrase:?}")]
    Unrecognized { rule: String, phrase: String },
}

/// Top-level failure from `Engine::process`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not running")]
    NotRunning,
    #[error("no rule is active for window {executable:?} / {title:?}")]
    NoActiveRule { executable: String, title: String },
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error(transparent)]
    Action(#[from] ActionError),
}
