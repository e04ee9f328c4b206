//! The rule registry and its processing loop.

use crate::backend::Backend;
use crate::context::WindowInfo;
use crate::dictation::TextCorrector;
use crate::dispatch::{DispatchSettings, RepeatRule, SharedRules, Utterance};
use crate::error::{ConfigError, EngineError};
use crate::history::{History, Outcome};
use crate::rule::MappingRule;
use std::collections::HashSet;
use std::sync::Arc;

/// Holds every installed `RepeatRule`. Rules are added while stopped; once
/// started, each utterance goes to the first rule whose context matches the
/// focused window.
pub struct Engine {
    shared: Arc<SharedRules>,
    corrector: TextCorrector,
    rules: Vec<RepeatRule>,
    running: bool,
    history: History,
    /// Utterances handed to `process` while running, including failures
    processed: u64,
    failed: u64,
}

impl Engine {
    pub fn new(
        settings: DispatchSettings,
        nested: MappingRule,
        dictation: MappingRule,
        final_rule: MappingRule,
        corrector: TextCorrector,
    ) -> Self {
        Self {
            shared: Arc::new(SharedRules {
                nested,
                dictation,
                final_rule,
                settings,
            }),
            corrector,
            rules: Vec::new(),
            running: false,
            history: History::default(),
            processed: 0,
            failed: 0,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = History::new(capacity);
        self
    }

    /// Nested, dictation and final rules plus settings, shared by every
    /// `RepeatRule`.
    pub fn shared(&self) -> Arc<SharedRules> {
        Arc::clone(&self.shared)
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.shared.settings
    }

    pub fn add_rule(&mut self, rule: RepeatRule) -> Result<(), ConfigError> {
        self.add_rules(vec![rule])
    }

    /// Add several rules, or none of them if any would be rejected.
    pub fn add_rules(&mut self, rules: Vec<RepeatRule>) -> Result<(), ConfigError> {
        if self.running {
            return Err(ConfigError::EngineRunning);
        }
        let mut names: HashSet<&str> = self.rules.iter().map(RepeatRule::name).collect();
        for rule in &rules {
            if !names.insert(rule.name()) {
                return Err(ConfigError::DuplicateRule(rule.name().to_string()));
            }
        }
        self.rules.extend(rules);
        Ok(())
    }

    pub fn rules(&self) -> &[RepeatRule] {
        &self.rules
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        tracing::info!(rules = self.rules.len(), "Engine started");
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            tracing::info!("Engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// First registered rule live for `window`. Children are installed
    /// before their parents, so the most specific node wins.
    pub fn active_rule(&self, window: &WindowInfo) -> Option<&RepeatRule> {
        self.rules.iter().find(|rule| rule.context().matches(window))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Total utterances processed since creation. Unlike `history`, never
    /// capped.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Recognize and dispatch one utterance.
    pub fn process(
        &mut self,
        utterance: &Utterance,
        backend: &mut dyn Backend,
    ) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }
        self.processed += 1;
        let phrases = utterance.phrases();
        let repeat = utterance.repeat.unwrap_or(1);
        let Some(rule) = self.active_rule(&utterance.window) else {
            let err = EngineError::NoActiveRule {
                executable: utterance.window.executable.clone(),
                title: utterance.window.title.clone(),
            };
            tracing::warn!(?phrases, "{err}");
            self.failed += 1;
            self.history.record(
                None,
                phrases,
                repeat,
                Outcome::Failed {
                    error: err.to_string(),
                },
            );
            return Err(err);
        };
        let rule_name = rule.name().to_string();
        let result = rule
            .recognize(utterance, &self.corrector)
            .map_err(EngineError::from)
            .and_then(|recognition| {
                tracing::debug!(rule = %rule_name, ?phrases, repeat, "Dispatching");
                rule.dispatch(&recognition, backend).map_err(EngineError::from)
            });
        let outcome = match &result {
            Ok(()) => {
                tracing::info!(rule = %rule_name, ?phrases, repeat, "Executed");
                Outcome::Executed
            }
            Err(e) => {
                self.failed += 1;
                tracing::warn!(rule = %rule_name, ?phrases, "Utterance failed: {e}");
                Outcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        self.history.record(Some(rule_name), phrases, repeat, outcome);
        result
    }
}
