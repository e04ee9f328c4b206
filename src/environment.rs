//! Hierarchy of per-application command tables.
//!
//! Each node inherits its parent's tables and narrows its parent's context.
//! On install every node registers one top-level `RepeatRule` whose context
//! excludes all of its children, so for any window exactly one node of a
//! well-formed tree is live.

use crate::context::Context;
use crate::dispatch::RepeatRule;
use crate::element::ElementMap;
use crate::engine::Engine;
use crate::error::ConfigError;
use crate::maps::combine_maps;
use crate::rule::{ActionMap, MappingRule};
use serde::{Deserialize, Serialize};

/// One node as written in a vocabulary file: only its own additions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default)]
    pub action_map: ActionMap,
    #[serde(default)]
    pub terminal_action_map: ActionMap,
    #[serde(default)]
    pub element_map: ElementMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EnvironmentSpec>,
}

impl EnvironmentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// A node with its effective (already merged) tables.
#[derive(Debug, Clone)]
pub struct Environment {
    name: String,
    context: Context,
    action_map: ActionMap,
    terminal_action_map: ActionMap,
    element_map: ElementMap,
    children: Vec<Environment>,
}

impl Environment {
    /// Root node. Children in `spec` are ignored; see `build`.
    pub fn root(spec: EnvironmentSpec) -> Self {
        Self {
            name: spec.name,
            context: spec.context.unwrap_or_default(),
            action_map: spec.action_map,
            terminal_action_map: spec.terminal_action_map,
            element_map: spec.element_map,
            children: Vec::new(),
        }
    }

    /// Attach a child whose tables and context are merged with this node's.
    pub fn add_child(&mut self, spec: EnvironmentSpec) -> &mut Environment {
        let child = Environment {
            name: spec.name,
            context: Context::and([self.context.clone(), spec.context.unwrap_or_default()]),
            action_map: combine_maps(&[&self.action_map, &spec.action_map]),
            terminal_action_map: combine_maps(&[
                &self.terminal_action_map,
                &spec.terminal_action_map,
            ]),
            element_map: combine_maps(&[&self.element_map, &spec.element_map]),
            children: Vec::new(),
        };
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Build a whole tree from a nested spec.
    pub fn build(mut spec: EnvironmentSpec) -> Self {
        let children = std::mem::take(&mut spec.children);
        let mut root = Self::root(spec);
        for child in children {
            root.attach(child);
        }
        root
    }

    fn attach(&mut self, mut spec: EnvironmentSpec) {
        let grandchildren = std::mem::take(&mut spec.children);
        let node = self.add_child(spec);
        for grandchild in grandchildren {
            node.attach(grandchild);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn action_map(&self) -> &ActionMap {
        &self.action_map
    }

    pub fn terminal_action_map(&self) -> &ActionMap {
        &self.terminal_action_map
    }

    pub fn element_map(&self) -> &ElementMap {
        &self.element_map
    }

    pub fn children(&self) -> &[Environment] {
        &self.children
    }

    /// This node's context minus every direct child's context.
    pub fn exclusive_context(&self) -> Context {
        Context::and(
            std::iter::once(self.context.clone())
                .chain(self.children.iter().map(|c| Context::not(c.context.clone()))),
        )
    }

    /// Register one `RepeatRule` per node, children before parents.
    /// Nothing is registered unless every node builds.
    pub fn install(&self, engine: &mut Engine) -> Result<(), ConfigError> {
        let mut rules = Vec::new();
        self.build_rules(engine, &mut rules)?;
        engine.add_rules(rules)
    }

    fn build_rules(&self, engine: &Engine, rules: &mut Vec<RepeatRule>) -> Result<(), ConfigError> {
        for child in &self.children {
            child.build_rules(engine, rules)?;
        }
        let command = MappingRule::new(
            format!("{}KeystrokeRule", self.name),
            &self.action_map,
            self.element_map.clone(),
        )?;
        let terminal = MappingRule::new(
            format!("{}TerminalRule", self.name),
            &self.terminal_action_map,
            self.element_map.clone(),
        )?;
        tracing::debug!(
            environment = %self.name,
            commands = self.action_map.len(),
            terminal_commands = self.terminal_action_map.len(),
            "Built environment rules"
        );
        rules.push(RepeatRule::new(
            format!("{}RepeatRule", self.name),
            self.exclusive_context(),
            command,
            terminal,
            engine.shared(),
        ));
        Ok(())
    }
}
