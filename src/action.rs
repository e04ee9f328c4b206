//! Executable units bound to command phrases.
//!
//! Actions are data: the command tables (built-in or loaded from a
//! vocabulary file) hold `Action` values and only turn them into input events
//! when a recognition is dispatched. String fields may contain `{name}`
//! placeholders filled from the extras captured by the phrase pattern.

use crate::backend::{Backend, InputEvent};
use crate::dictation::{format, format_two, tokenize, Convention};
use crate::element::{Extras, Value};
use crate::error::ActionError;
use crate::keys::{key_events, mouse_events};
use crate::template::{placeholders, render};
use serde::{Deserialize, Serialize};

fn default_normalize() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Key spec, e.g. `"c-s"` or `"down/5:{n}"`
    Key { spec: String },
    /// Typed text
    Text { text: String },
    /// Bulk text through the clipboard
    Paste { text: String },
    /// Mouse spec, e.g. `"left:2"`
    Mouse { spec: String },
    MouseMove { x: i32, y: i32 },
    Pause { ms: u64 },
    /// Tokenize the dictated value bound to `slot` and type it in `convention`
    Format {
        convention: Convention,
        slot: String,
        #[serde(default = "default_normalize")]
        normalize: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<Box<Action>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<Box<Action>>,
    },
    /// Camel-case two dictated values into a fixed frame
    FormatTwo {
        first: String,
        second: String,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        middle: String,
        #[serde(default)]
        suffix: String,
    },
    /// Run `actions` in order
    Sequence { actions: Vec<Action> },
}

impl Action {
    pub fn key(spec: impl Into<String>) -> Self {
        Action::Key { spec: spec.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Action::Text { text: text.into() }
    }

    pub fn paste(text: impl Into<String>) -> Self {
        Action::Paste { text: text.into() }
    }

    pub fn mouse(spec: impl Into<String>) -> Self {
        Action::Mouse { spec: spec.into() }
    }

    pub fn sequence(actions: impl IntoIterator<Item = Action>) -> Self {
        Action::Sequence {
            actions: actions.into_iter().collect(),
        }
    }

    pub fn format(convention: Convention, slot: impl Into<String>) -> Self {
        Action::Format {
            convention,
            slot: slot.into(),
            normalize: true,
            prefix: None,
            suffix: None,
        }
    }

    /// `format` wrapped in literal keys, e.g. `"</"` + tag + `">"`.
    pub fn format_framed(
        convention: Convention,
        slot: impl Into<String>,
        prefix: Option<Action>,
        suffix: Option<Action>,
    ) -> Self {
        Action::Format {
            convention,
            slot: slot.into(),
            normalize: true,
            prefix: prefix.map(Box::new),
            suffix: suffix.map(Box::new),
        }
    }

    /// Placeholder names this action reads from the extras.
    pub fn references(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut Vec<String>) {
        match self {
            Action::Key { spec: s } | Action::Mouse { spec: s } => {
                push_unique(names, placeholders(s))
            }
            Action::Text { text } | Action::Paste { text } => push_unique(names, placeholders(text)),
            Action::MouseMove { .. } | Action::Pause { .. } => {}
            Action::Format {
                slot,
                prefix,
                suffix,
                ..
            } => {
                push_unique(names, [slot.clone()]);
                for framed in [prefix, suffix].into_iter().flatten() {
                    framed.collect_references(names);
                }
            }
            Action::FormatTwo { first, second, .. } => {
                push_unique(names, [first.clone(), second.clone()])
            }
            Action::Sequence { actions } => {
                for action in actions {
                    action.collect_references(names);
                }
            }
        }
    }

    /// Check that key and mouse specs parse, with every placeholder bound to
    /// a representative value.
    pub fn validate(&self) -> Result<(), ActionError> {
        let sample: Extras = self
            .references()
            .into_iter()
            .map(|name| (name, Value::Int(1)))
            .collect();
        self.validate_with(&sample)
    }

    fn validate_with(&self, sample: &Extras) -> Result<(), ActionError> {
        match self {
            Action::Key { spec } => key_events(&render(spec, sample)?).map(|_| ()),
            Action::Mouse { spec } => mouse_events(&render(spec, sample)?).map(|_| ()),
            Action::Format { prefix, suffix, .. } => {
                for framed in [prefix, suffix].into_iter().flatten() {
                    framed.validate_with(sample)?;
                }
                Ok(())
            }
            Action::Sequence { actions } => actions.iter().try_for_each(|a| a.validate_with(sample)),
            _ => Ok(()),
        }
    }

    pub fn execute(&self, extras: &Extras, backend: &mut dyn Backend) -> Result<(), ActionError> {
        match self {
            Action::Key { spec } => send_all(backend, key_events(&render(spec, extras)?)?),
            Action::Mouse { spec } => send_all(backend, mouse_events(&render(spec, extras)?)?),
            Action::Text { text } => {
                let text = render(text, extras)?;
                if text.is_empty() {
                    return Ok(());
                }
                Ok(backend.send(InputEvent::Type { text })?)
            }
            Action::Paste { text } => {
                let text = render(text, extras)?;
                Ok(backend.send(InputEvent::ClipboardPaste { text })?)
            }
            Action::MouseMove { x, y } => Ok(backend.send(InputEvent::MouseMove { x: *x, y: *y })?),
            Action::Pause { ms } => Ok(backend.send(InputEvent::Pause { ms: *ms })?),
            Action::Format {
                convention,
                slot,
                normalize,
                prefix,
                suffix,
            } => {
                let words = tokenize(&slot_text(extras, slot)?, *normalize);
                let formatted = format(&words, *convention);
                if let Some(prefix) = prefix {
                    prefix.execute(extras, backend)?;
                }
                if !formatted.is_empty() {
                    backend.send(InputEvent::Type { text: formatted })?;
                }
                if let Some(suffix) = suffix {
                    suffix.execute(extras, backend)?;
                }
                Ok(())
            }
            Action::FormatTwo {
                first,
                second,
                prefix,
                middle,
                suffix,
            } => {
                let first = tokenize(&slot_text(extras, first)?, true);
                let second = tokenize(&slot_text(extras, second)?, true);
                let text = format_two(&first, &second, prefix, middle, suffix);
                Ok(backend.send(InputEvent::Type { text })?)
            }
            Action::Sequence { actions } => {
                for action in actions {
                    action.execute(extras, backend)?;
                }
                Ok(())
            }
        }
    }
}

fn push_unique(names: &mut Vec<String>, found: impl IntoIterator<Item = String>) {
    for name in found {
        if !names.contains(&name) {
            names.push(name);
        }
    }
}

fn slot_text(extras: &Extras, slot: &str) -> Result<String, ActionError> {
    extras
        .get(slot)
        .map(Value::as_text)
        .ok_or_else(|| ActionError::MissingExtra(slot.to_string()))
}

fn send_all(backend: &mut dyn Backend, events: Vec<InputEvent>) -> Result<(), ActionError> {
    for event in events {
        backend.send(event)?;
    }
    Ok(())
}

/// An action together with the values captured from the phrase that
/// selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAction {
    pub phrase: String,
    pub action: Action,
    pub extras: Extras,
}

impl BoundAction {
    pub fn new(phrase: impl Into<String>, action: Action, extras: Extras) -> Self {
        Self {
            phrase: phrase.into(),
            action,
            extras,
        }
    }

    pub fn execute(&self, backend: &mut dyn Backend) -> Result<(), ActionError> {
        self.action.execute(&self.extras, backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::keys::Modifier;

    fn extras(pairs: &[(&str, Value)]) -> Extras {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn typed(text: &str) -> InputEvent {
        InputEvent::Type { text: text.into() }
    }

    #[test]
    fn key_with_placeholder() {
        let mut backend = RecordingBackend::new();
        Action::key("down:{n}")
            .execute(&extras(&[("n", Value::Int(2))]), &mut backend)
            .unwrap();
        assert_eq!(backend.events.len(), 2);
        assert!(backend.events.iter().all(|e| matches!(
            e,
            InputEvent::KeyPress { key, .. } if key == "down"
        )));
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let mut backend = RecordingBackend::new();
        let err = Action::key("down:{n}")
            .execute(&Extras::new(), &mut backend)
            .unwrap_err();
        assert_eq!(err, ActionError::MissingExtra("n".into()));
        assert!(backend.events.is_empty());
    }

    #[test]
    fn paste_is_one_clipboard_event() {
        let mut backend = RecordingBackend::new();
        Action::paste("a long block of text")
            .execute(&Extras::new(), &mut backend)
            .unwrap();
        assert_eq!(
            backend.events,
            vec![InputEvent::ClipboardPaste {
                text: "a long block of text".into()
            }]
        );
    }

    #[test]
    fn sequence_runs_in_order() {
        let mut backend = RecordingBackend::new();
        Action::sequence([Action::text("()"), Action::key("left")])
            .execute(&Extras::new(), &mut backend)
            .unwrap();
        assert_eq!(
            backend.events,
            vec![
                typed("()"),
                InputEvent::KeyPress {
                    key: "left".into(),
                    modifiers: vec![]
                }
            ]
        );
    }

    #[test]
    fn format_wraps_with_prefix_and_suffix() {
        let mut backend = RecordingBackend::new();
        let action = Action::format_framed(
            Convention::Camel,
            "text",
            Some(Action::text("</")),
            Some(Action::text(">")),
        );
        action
            .execute(
                &extras(&[("text", Value::Text("list item".into()))]),
                &mut backend,
            )
            .unwrap();
        assert_eq!(
            backend.events,
            vec![typed("</"), typed("listItem"), typed(">")]
        );
    }

    #[test]
    fn format_two_fills_frame() {
        let mut backend = RecordingBackend::new();
        let action = Action::FormatTwo {
            first: "text".into(),
            second: "text2".into(),
            prefix: "foreach (var ".into(),
            middle: " in ".into(),
            suffix: ")".into(),
        };
        let ex = extras(&[
            ("text", Value::Text("item".into())),
            ("text2", Value::Text("the list items".into())),
        ]);
        action.execute(&ex, &mut backend).unwrap();
        assert_eq!(backend.events, vec![typed("foreach (var item in listItems)")]);
    }

    #[test]
    fn references_and_validation() {
        let action = Action::sequence([
            Action::key("c-{letter}"),
            Action::format(Convention::Snake, "text"),
        ]);
        assert_eq!(action.references(), vec!["letter".to_string(), "text".to_string()]);
        assert!(Action::key("c-left/5:{n}").validate().is_ok());
        assert_eq!(
            Action::key("c-nokey").validate(),
            Err(ActionError::UnknownKey("nokey".into()))
        );
    }

    #[test]
    fn backend_failure_propagates() {
        let mut backend = RecordingBackend::failing_at(0);
        let err = Action::key("cs-t")
            .execute(&Extras::new(), &mut backend)
            .unwrap_err();
        assert!(matches!(err, ActionError::Backend(_)));
    }

    #[test]
    fn deserializes_from_vocabulary_json() {
        let json = r#"{"type":"sequence","actions":[{"type":"key","spec":"c-s"},{"type":"format","convention":"caps","slot":"text"}]}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        let mut backend = RecordingBackend::new();
        action
            .execute(
                &extras(&[("text", Value::Text("save file".into()))]),
                &mut backend,
            )
            .unwrap();
        assert_eq!(
            backend.events,
            vec![
                InputEvent::KeyPress {
                    key: "s".into(),
                    modifiers: vec![Modifier::Ctrl]
                },
                typed("SaveFile")
            ]
        );
    }
}
