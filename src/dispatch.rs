//! The per-context top-level rule and its dispatch loop.
//!
//! A recognized utterance has the shape
//!
//! ```text
//! [<sequence>] [<nested>]
//!     ([<dictation>] [terminal <dictation>] | <terminal>)
//!     [repeat <n> times] [<final>]
//! ```
//!
//! `RepeatRule::recognize` turns the recognizer's phrases into bound actions
//! and `RepeatRule::dispatch` runs them: the whole body `n` times, then one
//! modifier release, then the final (window switching) command.

use crate::action::BoundAction;
use crate::backend::{Backend, InputEvent};
use crate::context::{Context, WindowInfo};
use crate::dictation::TextCorrector;
use crate::element::{Element, Value};
use crate::error::{ActionError, RecognitionError};
use crate::keys::{key_events, RELEASE_SPEC};
use crate::rule::MappingRule;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fixed timing and size limits for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Pause after each sequence command
    pub pace_ms: u64,
    /// Largest accepted repeat count (inclusive)
    pub max_repeat: u32,
    /// Most atomic commands in one utterance
    pub max_sequence: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            pace_ms: 50,
            max_repeat: 100,
            max_sequence: 5,
        }
    }
}

/// Recognizer output for one utterance.
///
/// `nested` may be combined with `sequence` and `terminal`; nothing enforces
/// that only one of them is present. `dictation` and `dictation_escape`
/// exclude `terminal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub window: WindowInfo,
    #[serde(default)]
    pub sequence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<String>,
    /// Formatting and dictation commands, each followed by a pause
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dictation: Vec<String>,
    /// One more dictation command, spoken as `terminal <dictation>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictation_escape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    #[serde(default, alias = "final", skip_serializing_if = "Option::is_none")]
    pub final_command: Option<String>,
}

impl Utterance {
    pub fn new(window: WindowInfo) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// All phrases in spoken order, for logging.
    pub fn phrases(&self) -> Vec<String> {
        self.sequence
            .iter()
            .chain(self.nested.iter())
            .chain(self.dictation.iter())
            .chain(self.dictation_escape.iter())
            .chain(self.terminal.iter())
            .chain(self.final_command.iter())
            .cloned()
            .collect()
    }
}

/// One fully resolved utterance, ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    sequence: Vec<BoundAction>,
    nested: Option<BoundAction>,
    dictation: Vec<BoundAction>,
    dictation_escape: Option<BoundAction>,
    terminal: Option<BoundAction>,
    final_action: Option<BoundAction>,
    repeat: u32,
}

impl Recognition {
    pub fn new(
        sequence: Vec<BoundAction>,
        repeat: u32,
        settings: &DispatchSettings,
    ) -> Result<Self, RecognitionError> {
        if repeat < 1 || repeat > settings.max_repeat {
            return Err(RecognitionError::RepeatOutOfRange {
                count: repeat,
                max: settings.max_repeat,
            });
        }
        if sequence.len() > settings.max_sequence {
            return Err(RecognitionError::SequenceTooLong {
                len: sequence.len(),
                max: settings.max_sequence,
            });
        }
        Ok(Self {
            sequence,
            nested: None,
            dictation: Vec::new(),
            dictation_escape: None,
            terminal: None,
            final_action: None,
            repeat,
        })
    }

    pub fn with_nested(mut self, nested: BoundAction) -> Self {
        self.nested = Some(nested);
        self
    }

    /// Dictation commands plus the optional `terminal <dictation>` escape.
    /// Not allowed together with a terminal command.
    pub fn with_dictation(
        mut self,
        dictation: Vec<BoundAction>,
        escape: Option<BoundAction>,
        settings: &DispatchSettings,
    ) -> Result<Self, RecognitionError> {
        if dictation.len() > settings.max_sequence {
            return Err(RecognitionError::SequenceTooLong {
                len: dictation.len(),
                max: settings.max_sequence,
            });
        }
        if self.terminal.is_some() && (!dictation.is_empty() || escape.is_some()) {
            return Err(RecognitionError::DictationWithTerminal);
        }
        self.dictation = dictation;
        self.dictation_escape = escape;
        Ok(self)
    }

    pub fn with_terminal(mut self, terminal: BoundAction) -> Result<Self, RecognitionError> {
        if !self.dictation.is_empty() || self.dictation_escape.is_some() {
            return Err(RecognitionError::DictationWithTerminal);
        }
        self.terminal = Some(terminal);
        Ok(self)
    }

    pub fn with_final(mut self, final_action: BoundAction) -> Self {
        self.final_action = Some(final_action);
        self
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn sequence(&self) -> &[BoundAction] {
        &self.sequence
    }
}

/// Rules shared by every `RepeatRule` of an engine.
#[derive(Debug)]
pub struct SharedRules {
    pub nested: MappingRule,
    pub dictation: MappingRule,
    pub final_rule: MappingRule,
    pub settings: DispatchSettings,
}

/// The top-level rule registered for one environment node.
#[derive(Debug, Clone)]
pub struct RepeatRule {
    name: String,
    context: Context,
    command: MappingRule,
    terminal: MappingRule,
    shared: Arc<SharedRules>,
}

impl RepeatRule {
    pub fn new(
        name: impl Into<String>,
        context: Context,
        command: MappingRule,
        terminal: MappingRule,
        shared: Arc<SharedRules>,
    ) -> Self {
        Self {
            name: name.into(),
            context,
            command,
            terminal,
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn command_rule(&self) -> &MappingRule {
        &self.command
    }

    pub fn terminal_rule(&self) -> &MappingRule {
        &self.terminal
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.shared.settings
    }

    /// Resolve every phrase of `utterance` against this rule's grammar.
    pub fn recognize(
        &self,
        utterance: &Utterance,
        corrector: &TextCorrector,
    ) -> Result<Recognition, RecognitionError> {
        let settings = &self.shared.settings;
        if utterance.sequence.len() > settings.max_sequence {
            return Err(RecognitionError::SequenceTooLong {
                len: utterance.sequence.len(),
                max: settings.max_sequence,
            });
        }
        if utterance.dictation.len() > settings.max_sequence {
            return Err(RecognitionError::SequenceTooLong {
                len: utterance.dictation.len(),
                max: settings.max_sequence,
            });
        }
        if utterance.terminal.is_some()
            && (!utterance.dictation.is_empty() || utterance.dictation_escape.is_some())
        {
            return Err(RecognitionError::DictationWithTerminal);
        }
        let sequence = utterance
            .sequence
            .iter()
            .map(|phrase| resolve(&self.command, phrase, corrector))
            .collect::<Result<Vec<_>, _>>()?;
        let mut recognition = Recognition::new(sequence, utterance.repeat.unwrap_or(1), settings)?;
        if let Some(phrase) = &utterance.nested {
            recognition = recognition.with_nested(resolve(&self.shared.nested, phrase, corrector)?);
        }
        if !utterance.dictation.is_empty() || utterance.dictation_escape.is_some() {
            let dictation_rule = &self.shared.dictation;
            let dictation = utterance
                .dictation
                .iter()
                .map(|phrase| resolve(dictation_rule, phrase, corrector))
                .collect::<Result<Vec<_>, _>>()?;
            let escape = utterance
                .dictation_escape
                .as_deref()
                .map(|phrase| resolve(dictation_rule, phrase, corrector))
                .transpose()?;
            recognition = recognition.with_dictation(dictation, escape, settings)?;
        }
        if let Some(phrase) = &utterance.terminal {
            recognition = recognition.with_terminal(resolve(&self.terminal, phrase, corrector)?)?;
        }
        if let Some(phrase) = &utterance.final_command {
            recognition =
                recognition.with_final(resolve(&self.shared.final_rule, phrase, corrector)?);
        }
        Ok(recognition)
    }

    /// Execute `recognition`. On failure the rest of the body is abandoned,
    /// modifiers are still released and the final command is skipped.
    pub fn dispatch(
        &self,
        recognition: &Recognition,
        backend: &mut dyn Backend,
    ) -> Result<(), ActionError> {
        let body = self.run_body(recognition, backend);
        let released = release_modifiers(backend);
        if let Err(err) = body {
            if let Err(release_err) = released {
                tracing::warn!(rule = %self.name, "Modifier release failed: {release_err}");
            }
            return Err(err);
        }
        released?;
        if let Some(final_action) = &recognition.final_action {
            final_action.execute(backend)?;
        }
        Ok(())
    }

    fn run_body(&self, recognition: &Recognition, backend: &mut dyn Backend) -> Result<(), ActionError> {
        let pace = self.shared.settings.pace_ms;
        for _ in 0..recognition.repeat {
            for action in &recognition.sequence {
                action.execute(backend)?;
                backend.send(InputEvent::Pause { ms: pace })?;
            }
            if let Some(nested) = &recognition.nested {
                nested.execute(backend)?;
            }
            for action in &recognition.dictation {
                action.execute(backend)?;
                backend.send(InputEvent::Pause { ms: pace })?;
            }
            if let Some(escape) = &recognition.dictation_escape {
                escape.execute(backend)?;
            }
            if let Some(terminal) = &recognition.terminal {
                terminal.execute(backend)?;
            }
        }
        Ok(())
    }
}

fn release_modifiers(backend: &mut dyn Backend) -> Result<(), ActionError> {
    for event in key_events(RELEASE_SPEC)? {
        backend.send(event)?;
    }
    Ok(())
}

/// Resolve one phrase and run dictated values through the corrector.
fn resolve(
    rule: &MappingRule,
    phrase: &str,
    corrector: &TextCorrector,
) -> Result<BoundAction, RecognitionError> {
    let mut bound = rule
        .resolve(phrase)
        .ok_or_else(|| RecognitionError::Unrecognized {
            rule: rule.name().to_string(),
            phrase: phrase.to_string(),
        })?;
    if !corrector.is_empty() {
        for (name, value) in bound.extras.iter_mut() {
            if let Value::Text(text) = value
                && matches!(rule.element(name).map(|d| &d.element), Some(Element::Dictation))
            {
                *text = corrector.correct(text);
            }
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::backend::RecordingBackend;
    use crate::dictation::Convention;
    use crate::element::{ElementDef, ElementMap, Extras};
    use crate::rule::ActionMap;
    use std::collections::HashMap;

    fn bound(text: &str) -> BoundAction {
        BoundAction::new(text, Action::text(text), Extras::new())
    }

    fn typed(text: &str) -> InputEvent {
        InputEvent::Type { text: text.into() }
    }

    fn key_up(key: &str) -> InputEvent {
        InputEvent::KeyUp { key: key.into() }
    }

    fn release_events() -> Vec<InputEvent> {
        vec![key_up("shift"), key_up("ctrl"), key_up("alt")]
    }

    fn actions(pairs: &[(&str, Action)]) -> ActionMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn shared() -> Arc<SharedRules> {
        let nested = MappingRule::new(
            "CharacterRule",
            &actions(&[("print", Action::text("N"))]),
            ElementMap::new(),
        )
        .unwrap();
        let final_rule = MappingRule::new(
            "FinalRule",
            &actions(&[("go", Action::text("F"))]),
            ElementMap::new(),
        )
        .unwrap();
        let mut dictation_elements = ElementMap::new();
        dictation_elements.insert("text".into(), ElementDef::new(Element::Dictation));
        let dictation = MappingRule::new(
            "DictationRule",
            &actions(&[
                ("say <text>", Action::text("{text}")),
                ("camel <text>", Action::format(Convention::Camel, "text")),
            ]),
            dictation_elements,
        )
        .unwrap();
        Arc::new(SharedRules {
            nested,
            dictation,
            final_rule,
            settings: DispatchSettings::default(),
        })
    }

    fn repeat_rule() -> RepeatRule {
        let mut elements = ElementMap::new();
        elements.insert("text".into(), ElementDef::new(Element::Dictation));
        let command = MappingRule::new(
            "GlobalKeystrokeRule",
            &actions(&[("alpha", Action::text("A")), ("bravo", Action::text("B"))]),
            elements.clone(),
        )
        .unwrap();
        let terminal = MappingRule::new(
            "GlobalTerminalRule",
            &actions(&[("say <text>", Action::text("{text}"))]),
            elements,
        )
        .unwrap();
        RepeatRule::new("GlobalRepeatRule", Context::Any, command, terminal, shared())
    }

    #[test]
    fn dispatch_order_with_final_after_release() {
        let rule = repeat_rule();
        let recognition = Recognition::new(vec![bound("A"), bound("B")], 2, rule.settings())
            .unwrap()
            .with_nested(bound("N"))
            .with_terminal(bound("T"))
            .unwrap()
            .with_final(bound("F"));
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();

        let mut expected = Vec::new();
        for _ in 0..2 {
            expected.extend([typed("A"), typed("B"), typed("N"), typed("T")]);
        }
        expected.extend(release_events());
        expected.push(typed("F"));
        assert_eq!(backend.without_pauses(), expected);

        // pace follows each sequence command only
        let pauses = backend
            .events
            .iter()
            .filter(|e| **e == InputEvent::Pause { ms: 50 })
            .count();
        assert_eq!(pauses, 4);
        assert_eq!(backend.events[1], InputEvent::Pause { ms: 50 });
    }

    #[test]
    fn dictation_runs_between_nested_and_final() {
        let rule = repeat_rule();
        let recognition = Recognition::new(vec![bound("A")], 2, rule.settings())
            .unwrap()
            .with_nested(bound("N"))
            .with_dictation(vec![bound("D1"), bound("D2")], Some(bound("E")), rule.settings())
            .unwrap()
            .with_final(bound("F"));
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();

        let mut expected = Vec::new();
        for _ in 0..2 {
            expected.extend([typed("A"), typed("N"), typed("D1"), typed("D2"), typed("E")]);
        }
        expected.extend(release_events());
        expected.push(typed("F"));
        assert_eq!(backend.without_pauses(), expected);

        // A, N, D1, pause, D2, pause, E: each dictation command is paced
        let first_round: Vec<&InputEvent> = backend.events.iter().take(8).collect();
        assert_eq!(first_round[2], &typed("N"));
        assert_eq!(first_round[4], &InputEvent::Pause { ms: 50 });
        assert_eq!(first_round[6], &InputEvent::Pause { ms: 50 });
        assert_eq!(first_round[7], &typed("E"));
    }

    #[test]
    fn dictation_and_terminal_are_alternatives() {
        let rule = repeat_rule();
        let settings = rule.settings();
        let with_terminal = Recognition::new(Vec::new(), 1, settings)
            .unwrap()
            .with_terminal(bound("T"))
            .unwrap();
        assert_eq!(
            with_terminal
                .with_dictation(Vec::new(), Some(bound("E")), settings)
                .unwrap_err(),
            RecognitionError::DictationWithTerminal
        );
        let with_dictation = Recognition::new(Vec::new(), 1, settings)
            .unwrap()
            .with_dictation(vec![bound("D")], None, settings)
            .unwrap();
        assert_eq!(
            with_dictation.with_terminal(bound("T")).unwrap_err(),
            RecognitionError::DictationWithTerminal
        );
        let six = (0..6).map(|_| bound("D")).collect();
        assert_eq!(
            Recognition::new(Vec::new(), 1, settings)
                .unwrap()
                .with_dictation(six, None, settings)
                .unwrap_err(),
            RecognitionError::SequenceTooLong { len: 6, max: 5 }
        );

        let utterance: Utterance = serde_json::from_str(
            r#"{"dictation":["say hi"],"terminal":"say there"}"#,
        )
        .unwrap();
        assert_eq!(
            rule.recognize(&utterance, &TextCorrector::new()).unwrap_err(),
            RecognitionError::DictationWithTerminal
        );
    }

    #[test]
    fn recognize_resolves_dictation_against_shared_rule() {
        let rule = repeat_rule();
        let utterance: Utterance = serde_json::from_str(
            r#"{"sequence":["alpha"],"dictation":["camel big value","say done"],"dictation_escape":"say end","repeat":2}"#,
        )
        .unwrap();
        let recognition = rule.recognize(&utterance, &TextCorrector::new()).unwrap();
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();
        let mut expected = Vec::new();
        for _ in 0..2 {
            expected.extend([typed("A"), typed("bigValue"), typed("done"), typed("end")]);
        }
        expected.extend(release_events());
        assert_eq!(backend.without_pauses(), expected);
        assert_eq!(
            utterance.phrases(),
            vec!["alpha", "camel big value", "say done", "say end"]
        );
    }

    #[test]
    fn exactly_one_release_per_recognition() {
        let rule = repeat_rule();
        for repeat in [1, 5, 100] {
            let recognition = Recognition::new(vec![bound("A")], repeat, rule.settings()).unwrap();
            let mut backend = RecordingBackend::new();
            rule.dispatch(&recognition, &mut backend).unwrap();
            let releases = backend
                .events
                .iter()
                .filter(|e| **e == key_up("alt"))
                .count();
            assert_eq!(releases, 1, "repeat {repeat}");
            assert_eq!(backend.events[backend.events.len() - 3..], release_events()[..]);
        }
    }

    #[test]
    fn empty_recognition_still_releases() {
        let rule = repeat_rule();
        let recognition = Recognition::new(Vec::new(), 1, rule.settings()).unwrap();
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();
        assert_eq!(backend.events, release_events());
    }

    #[test]
    fn failure_abandons_body_releases_and_skips_final() {
        let rule = repeat_rule();
        let recognition = Recognition::new(vec![bound("A"), bound("B")], 1, rule.settings())
            .unwrap()
            .with_final(bound("F"));
        // A, pause, then B is rejected
        let mut backend = RecordingBackend::failing_at(2);
        let err = rule.dispatch(&recognition, &mut backend).unwrap_err();
        assert!(matches!(err, ActionError::Backend(_)));
        let mut expected = vec![typed("A")];
        expected.extend(release_events());
        assert_eq!(backend.without_pauses(), expected);
    }

    #[test]
    fn recognition_limits() {
        let settings = DispatchSettings::default();
        assert_eq!(
            Recognition::new(Vec::new(), 0, &settings).unwrap_err(),
            RecognitionError::RepeatOutOfRange { count: 0, max: 100 }
        );
        assert_eq!(
            Recognition::new(Vec::new(), 101, &settings).unwrap_err(),
            RecognitionError::RepeatOutOfRange { count: 101, max: 100 }
        );
        assert!(Recognition::new(Vec::new(), 100, &settings).is_ok());
        let six = (0..6).map(|_| bound("A")).collect();
        assert_eq!(
            Recognition::new(six, 1, &settings).unwrap_err(),
            RecognitionError::SequenceTooLong { len: 6, max: 5 }
        );
    }

    #[test]
    fn recognize_resolves_every_part() {
        let rule = repeat_rule();
        let utterance: Utterance = serde_json::from_str(
            r#"{"sequence":["alpha","bravo"],"nested":"print","terminal":"say hello","repeat":3,"final":"go"}"#,
        )
        .unwrap();
        let recognition = rule.recognize(&utterance, &TextCorrector::new()).unwrap();
        assert_eq!(recognition.repeat(), 3);
        assert_eq!(recognition.sequence().len(), 2);
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();
        let typed_count = backend
            .events
            .iter()
            .filter(|e| **e == typed("hello"))
            .count();
        assert_eq!(typed_count, 3);
        assert_eq!(backend.events.last(), Some(&typed("F")));
    }

    #[test]
    fn recognize_rejects_unknown_phrase() {
        let rule = repeat_rule();
        let mut utterance = Utterance::default();
        utterance.sequence = vec!["charlie".into()];
        assert_eq!(
            rule.recognize(&utterance, &TextCorrector::new()).unwrap_err(),
            RecognitionError::Unrecognized {
                rule: "GlobalKeystrokeRule".into(),
                phrase: "charlie".into()
            }
        );
    }

    #[test]
    fn dictated_values_are_corrected() {
        let rule = repeat_rule();
        let corrector =
            TextCorrector::from_map(HashMap::from([("get hub".to_string(), "github".to_string())]));
        let mut utterance = Utterance::default();
        utterance.terminal = Some("say open get hub".into());
        let recognition = rule.recognize(&utterance, &corrector).unwrap();
        let mut backend = RecordingBackend::new();
        rule.dispatch(&recognition, &mut backend).unwrap();
        assert_eq!(backend.events[0], typed("open github"));
    }
}
