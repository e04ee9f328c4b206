use crate::action::{Action, BoundAction};
use crate::element::{ElementDef, ElementMap};
use crate::error::ConfigError;
use crate::pattern::Pattern;
use std::collections::BTreeMap;

/// Phrase pattern → action.
pub type ActionMap = BTreeMap<String, Action>;

/// A validated command table: every pattern parses, every slot names an
/// element, every action placeholder is bound by its pattern and every key
/// spec parses.
#[derive(Debug, Clone)]
pub struct MappingRule {
    name: String,
    entries: Vec<(Pattern, Action)>,
    elements: ElementMap,
}

impl MappingRule {
    pub fn new(
        name: impl Into<String>,
        actions: &ActionMap,
        elements: ElementMap,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if actions.is_empty() {
            return Ok(Self::empty(name));
        }
        let mut entries = Vec::with_capacity(actions.len());
        for (source, action) in actions {
            let pattern = Pattern::parse(source).map_err(|source_err| ConfigError::Pattern {
                rule: name.clone(),
                pattern: source.clone(),
                source: source_err,
            })?;
            let slots = pattern.references();
            if let Some(missing) = slots.iter().find(|s| !elements.contains_key(*s)) {
                return Err(ConfigError::UnknownElement {
                    rule: name.clone(),
                    pattern: source.clone(),
                    name: missing.clone(),
                });
            }
            if let Some(unbound) = action.references().into_iter().find(|r| !slots.contains(r)) {
                return Err(ConfigError::UnknownPlaceholder {
                    rule: name.clone(),
                    pattern: source.clone(),
                    name: unbound,
                });
            }
            // An optional slot without a default would leave the placeholder
            // empty at dispatch time
            let required = pattern.required_references();
            if let Some(optional) = action.references().into_iter().find(|r| {
                !required.contains(r)
                    && elements.get(r).is_some_and(|def| def.default.is_none())
            }) {
                return Err(ConfigError::OptionalPlaceholder {
                    rule: name.clone(),
                    pattern: source.clone(),
                    name: optional,
                });
            }
            action.validate().map_err(|e| ConfigError::Action {
                rule: name.clone(),
                pattern: source.clone(),
                source: e,
            })?;
            entries.push((pattern, action.clone()));
        }
        // "upper score <text>" must be tried before "upper <text>"
        entries.sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.literal_words()));
        tracing::debug!(rule = %name, commands = entries.len(), "Built mapping rule");
        Ok(Self {
            name,
            entries,
            elements,
        })
    }

    /// Placeholder rule: matches only the empty phrase and does nothing.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: vec![(Pattern::empty(), Action::sequence([]))],
            elements: ElementMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(p, _)| p.source().trim().is_empty())
    }

    /// First command whose pattern matches the whole phrase, trying patterns
    /// with more literal words first.
    pub fn resolve(&self, phrase: &str) -> Option<BoundAction> {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_string).collect();
        self.entries.iter().find_map(|(pattern, action)| {
            pattern
                .match_phrase(&words, &self.elements)
                .map(|extras| BoundAction::new(phrase.trim(), action.clone(), extras))
        })
    }
}
