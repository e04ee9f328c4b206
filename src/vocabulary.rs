//! Built-in command tables.
//!
//! The same shape is accepted from a vocabulary file (see
//! `config::load_vocabulary`); `voicecommander --dump-vocabulary` prints these
//! defaults as a starting point.

use crate::action::Action;
use crate::context::Context;
use crate::dictation::{Convention, FORMATTERS};
use crate::element::{Element, ElementDef, ElementMap, Value};
use crate::environment::{Environment, EnvironmentSpec};
use crate::error::ConfigError;
use crate::keys::RELEASE_SPEC;
use crate::maps::{combine_maps, text_map_to_action_map};
use crate::rule::{ActionMap, MappingRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stand-alone rule: its commands and the elements they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub action_map: ActionMap,
    #[serde(default)]
    pub element_map: ElementMap,
}

impl RuleSpec {
    pub fn build(&self, name: &str) -> Result<MappingRule, ConfigError> {
        MappingRule::new(name, &self.action_map, self.element_map.clone())
    }
}

/// Everything the engine needs: the environment tree, the nested rule
/// (character spelling), the dictation rule and the final rule (window
/// switching).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    pub root: EnvironmentSpec,
    #[serde(default)]
    pub nested: RuleSpec,
    /// Commands allowed in the dictation part of an utterance
    #[serde(default)]
    pub dictation: RuleSpec,
    #[serde(default, alias = "final")]
    pub final_rule: RuleSpec,
}

impl VocabularyConfig {
    pub fn builtin() -> Self {
        let mut root = global();
        let nested = nested();
        let dictation = dictation(&root, &nested);
        root.children = vec![chrome(), visual_studio(), slack(), explorer()];
        Self {
            root,
            nested,
            dictation,
            final_rule: final_rule(),
        }
    }

    pub fn environment(&self) -> Environment {
        Environment::build(self.root.clone())
    }

    pub fn nested_rule(&self) -> Result<MappingRule, ConfigError> {
        self.nested.build("NestedRule")
    }

    pub fn dictation_rule(&self) -> Result<MappingRule, ConfigError> {
        self.dictation.build("DictationRule")
    }

    pub fn final_rule(&self) -> Result<MappingRule, ConfigError> {
        self.final_rule.build("FinalRule")
    }
}

// --- Tables ---

const SYMBOLS: &[(&str, &str)] = &[
    ("plus", " + "),
    ("dub plus", "++"),
    ("minus", " - "),
    ("come", ", "),
    ("place", ": "),
    ("fuel", ":"),
    ("equals", " = "),
    ("dub equals", " == "),
    ("bang it", " != "),
    ("plus it", " += "),
    ("greater than", " > "),
    ("less than", " < "),
    ("greater equals", " >= "),
    ("less equals", " <= "),
    ("fleck", "."),
    ("leap", "("),
    ("reap", ")"),
    ("lake", "{"),
    ("rake", "}"),
    ("lobe", "["),
    ("robe", "]"),
    ("luke", "<"),
    ("ruke", ">"),
    ("quote", "\""),
    ("dash", "-"),
    ("geek", ";"),
    ("bang", "!"),
    ("percent", "%"),
    ("star", "*"),
    ("slash", "/"),
    ("rear back", "\\"),
    ("floor", "_"),
    ("sick quote", "'"),
    ("arrow", " ->"),
    ("fat arrow", " => "),
    ("dub coal", "::"),
    ("amper", "&"),
    ("dub and", " && "),
    ("pipe", "|"),
    ("dub pipe", " || "),
    ("hash", "#"),
    ("question", "?"),
    ("space", " "),
];

const NUMBERS: &[(&str, &str)] = &[
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("point", "."),
    ("minus", "-"),
    ("slash", "/"),
    ("coal", ":"),
];

const LETTERS: &[(&str, &str)] = &[
    ("ace", "a"),
    ("bed", "b"),
    ("chair", "c"),
    ("dell", "d"),
    ("egg", "e"),
    ("fame", "f"),
    ("golf", "g"),
    ("heart", "h"),
    ("ice", "i"),
    ("joy", "j"),
    ("king", "k"),
    ("love", "l"),
    ("mars", "m"),
    ("neck", "n"),
    ("ork", "o"),
    ("pork", "p"),
    ("quest", "q"),
    ("rug", "r"),
    ("sea", "s"),
    ("tan", "t"),
    ("ush", "u"),
    ("van", "v"),
    ("wish", "w"),
    ("trex", "x"),
    ("yang", "y"),
    ("zulu", "z"),
];

/// Pinned taskbar entries, in order. "go code" is Win+2.
const WINDOWS: &[&str] = &[
    "browse", "code", "storm", "text", "source", "email", "slack", "paint", "explore",
];

fn keys(pairs: &[(&str, &str)]) -> ActionMap {
    pairs
        .iter()
        .map(|(phrase, spec)| (phrase.to_string(), Action::key(*spec)))
        .collect()
}

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn spelled(pairs: &[(&str, &str)], min: usize, max: usize) -> Element {
    Element::Repetition {
        choices: table(pairs),
        min,
        max,
        separator: String::new(),
    }
}

fn count(max: i64) -> ElementDef {
    ElementDef::with_default(Element::Integer { min: 1, max }, Value::Int(1))
}

/// Release stuck modifiers before a chord.
fn released(spec: &str) -> Action {
    Action::sequence([Action::key(RELEASE_SPEC), Action::key(spec)])
}

fn camel_after(prefix: Action) -> Action {
    Action::format_framed(Convention::Camel, "text1", Some(prefix), None)
}

fn caps_after(prefix: Action) -> Action {
    Action::format_framed(Convention::Pascal, "text1", Some(prefix), None)
}

fn global() -> EnvironmentSpec {
    let mut actions = keys(&[
        ("punch [<n>]", "enter/5:{n}"),
        ("tab [<n>]", "tab/5:{n}"),
        // Navigation
        ("up [<n>]", "up/5:{n}"),
        ("down [<n>]", "down/5:{n}"),
        ("left [<n>]", "left/5:{n}"),
        ("right [<n>]", "right/5:{n}"),
        ("lord [<n>]", "c-left/5:{n}"),
        ("sword [<n>]", "c-right/5:{n}"),
        ("west", "home"),
        ("east", "end"),
        ("page up [<n>]", "pgup/5:{n}"),
        ("page down [<n>]", "pgdown/5:{n}"),
        ("north", "c-home"),
        ("south", "c-end"),
        // Deletion
        ("crash [<n>]", "backspace/5:{n}"),
        ("crack [<n>]", "del/5:{n}"),
        // Windows
        ("pop up", "apps"),
        ("do left", "w-left"),
        ("do right", "w-right"),
        ("do up", "w-up"),
        ("do down", "w-down:2"),
        ("go desk", "w-d"),
        // Undo/redo
        ("fail [<n>]", "c-z/5:{n}"),
        ("redo [<n>]", "c-y/5:{n}"),
        // Files
        ("save", "c-s"),
        ("save as", "cs-s"),
        ("file rename", "f2"),
        // Misc
        ("find", "c-f"),
        ("escape|quit", "escape"),
        ("race", "end/5, enter"),
        ("coke [<n>]", "s-tab/5:{n}"),
        ("dollar", "s-4"),
        ("at symbol", "s-2"),
    ]);
    actions.extend([
        ("slay [<n>]".to_string(), released("c-backspace/5:{n}")),
        ("kill [<n>]".to_string(), released("c-del/5:{n}")),
        (
            "copy".to_string(),
            Action::sequence([released("c-c"), Action::mouse("left:up")]),
        ),
        ("paste".to_string(), released("c-v")),
        ("cut [<n>]".to_string(), released("c-x/5:{n}")),
        ("mark all".to_string(), released("c-a")),
        ("mark line".to_string(), released("home/5, shift:down/5, end")),
        ("mark west".to_string(), released("shift:down, home")),
        ("mark east".to_string(), released("shift:down, end")),
        ("mark right [<n>]".to_string(), released("shift:down, c-right/5:{n}")),
        ("mark left [<n>]".to_string(), released("shift:down, c-left/5:{n}")),
        ("mark it".to_string(), released("c-right/5, shift:down, c-left")),
        ("fish".to_string(), Action::mouse("left")),
        ("fish right".to_string(), Action::mouse("right")),
        ("middle".to_string(), Action::mouse("middle")),
        ("fish twice".to_string(), Action::mouse("left:2")),
        ("drag".to_string(), Action::mouse("left:down")),
        ("break".to_string(), Action::mouse("left:up")),
        (
            "control panel".to_string(),
            Action::sequence([
                Action::key("win/15"),
                Action::text("control panel"),
                Action::key("space/15, enter"),
            ]),
        ),
    ]);
    let action_map = combine_maps(&[&text_map_to_action_map(SYMBOLS), &actions]);

    let mut terminal_action_map: ActionMap = FORMATTERS
        .iter()
        .map(|(phrase, convention)| {
            let verbatim = matches!(convention, Convention::Verbatim | Convention::Sentence);
            let action = Action::Format {
                convention: *convention,
                slot: "text".into(),
                normalize: !verbatim,
                prefix: None,
                suffix: None,
            };
            (format!("{phrase} <text>"), action)
        })
        .collect();
    terminal_action_map.insert(
        "program <text>".into(),
        Action::sequence([Action::key("win/40"), Action::text("{text}")]),
    );

    let element_map = ElementMap::from([
        ("n".to_string(), count(21)),
        ("text".to_string(), ElementDef::new(Element::Dictation)),
        ("text1".to_string(), ElementDef::new(Element::Dictation)),
        ("text2".to_string(), ElementDef::new(Element::Dictation)),
        ("letters".to_string(), ElementDef::new(spelled(LETTERS, 1, 10))),
    ]);

    EnvironmentSpec {
        name: "Global".into(),
        context: None,
        action_map,
        terminal_action_map,
        element_map,
        children: Vec::new(),
    }
}

fn chrome() -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new("Chrome").with_context(Context::title(" - Google Chrome"));
    spec.action_map = keys(&[
        ("now", "c-t"),
        ("spy", "cs-n"),
        ("new window", "c-n"),
        ("close [<n>]", "c-w/5:{n}"),
        ("live [<n>]", "cs-t/5:{n}"),
        ("back [<n>]", "a-left/15:{n}"),
        ("forward [<n>]", "a-right/15:{n}"),
        ("fresh", "c-r"),
        ("next [<n>]", "c-tab:{n}"),
        ("pro [<n>]", "cs-tab:{n}"),
        ("to <n>", "c-{n}"),
        ("last", "c-9"),
        ("menu", "a-f"),
        ("full screen", "f11"),
        ("history", "c-h"),
        ("bar", "c-l"),
        ("bookmark", "c-d"),
        ("pro match", "cs-g"),
        ("zoom", "c-plus"),
        ("zoom out", "c-minus"),
        ("scan", "cs-c"),
        ("shift rise", "s-up"),
    ]);
    spec.terminal_action_map = ActionMap::from([
        (
            "search <text>".to_string(),
            Action::sequence([Action::key("c-t/15"), Action::text("{text}")]),
        ),
        (
            "find <text>".to_string(),
            Action::sequence([Action::key("c-f/5"), Action::text("{text}")]),
        ),
    ]);
    spec.element_map = ElementMap::from([
        (
            "n".to_string(),
            ElementDef::with_default(Element::Integer { min: 0, max: 10 }, Value::Int(1)),
        ),
        ("letters".to_string(), ElementDef::new(spelled(LETTERS, 1, 4))),
    ]);
    spec
}

fn visual_studio() -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new("Visual_studio")
        .with_context(Context::title(" - Microsoft Visual Studio"));
    spec.action_map = keys(&[
        ("next [<n>]", "c-tab/5:{n}"),
        ("pro [<n>]", "cs-tab/5:{n}"),
        ("close [<n>]", "c-f4/5:{n}"),
        ("drop [<n>]", "cs-l/15:{n}"),
        ("back [<n>]", "c-hyphen/15:{n}"),
        ("forward [<n>]", "cs-hyphen/15:{n}"),
        ("search", "cs-f/5"),
        ("open project", "cs-o"),
        ("show type", "ctrl:down, k, i, ctrl:up"),
        ("build", "cs-b"),
        ("lunch [<n>]", "f5/15:{n}"),
        ("restart", "cs-f5"),
        ("breakpoint", "f9"),
        ("germ it [<n>]", "f10/15:{n}"),
        ("step into", "f11"),
        ("germ end", "s-f5"),
    ]);
    spec.action_map.insert(
        "line [<num_seq>]".into(),
        Action::sequence([
            Action::key("c-g/15"),
            Action::text("{num_seq}"),
            Action::key("enter"),
        ]),
    );
    spec.terminal_action_map = ActionMap::from([
        ("search <text1>".to_string(), camel_after(Action::key("cs-f/30"))),
        ("find <text1>".to_string(), camel_after(Action::key("c-f/15"))),
        ("fly <text1>".to_string(), camel_after(Action::key("cs-t/5"))),
        (
            "file <letters>".to_string(),
            Action::sequence([Action::key("cs-t/5"), Action::text("{letters}")]),
        ),
        ("class <text1>".to_string(), caps_after(Action::text("class "))),
        ("string <text1>".to_string(), camel_after(Action::text("string "))),
        (
            "loop <text1> in <text2>".to_string(),
            Action::FormatTwo {
                first: "text1".into(),
                second: "text2".into(),
                prefix: "foreach (var ".into(),
                middle: " in ".into(),
                suffix: String::new(),
            },
        ),
    ]);
    spec.element_map = ElementMap::from([(
        "num_seq".to_string(),
        ElementDef::with_default(spelled(NUMBERS, 1, 6), Value::Text(String::new())),
    )]);
    spec
}

fn slack() -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new("Slack").with_context(Context::executable("Slack"));
    spec.action_map = keys(&[
        ("pro [<n>]", "a-up/5:{n}"),
        ("next [<n>]", "a-down/5:{n}"),
        ("read [<n>]", "as-down/5:{n}"),
        ("back [<n>]", "a-left/5:{n}"),
        ("forward [<n>]", "a-right/5:{n}"),
        ("firm|one", "c-1"),
        ("intern|two", "c-2"),
    ]);
    spec.terminal_action_map = ActionMap::from([(
        "now <letters>".to_string(),
        Action::sequence([Action::key("cs-t/15"), Action::text("{letters}")]),
    )]);
    spec.element_map = ElementMap::from([(
        "letters".to_string(),
        ElementDef::new(spelled(LETTERS, 1, 4)),
    )]);
    spec
}

/// Paste `path` into the address bar.
fn to_dir(path: &str) -> Action {
    Action::sequence([
        Action::key("c-l/15"),
        Action::paste(path),
        Action::key("enter"),
    ])
}

fn explorer() -> EnvironmentSpec {
    let mut spec =
        EnvironmentSpec::new("Windows_Explorer").with_context(Context::executable("explorer"));
    spec.action_map = keys(&[
        ("back [<n>]", "a-left/5:{n}"),
        ("forward [<n>]", "a-right/5:{n}"),
        ("pro [<n>]", "a-up/5:{n}"),
        ("recent", "f4"),
    ]);
    spec.action_map.insert("drive".into(), to_dir(r"C:\"));
    spec.action_map.insert("box".into(), to_dir(r"%USERPROFILE%\Downloads"));
    spec.action_map.insert("documents".into(), to_dir(r"%USERPROFILE%\Documents"));
    spec.terminal_action_map = ActionMap::from([(
        "search <text1>".to_string(),
        caps_after(Action::key("c-e")),
    )]);
    spec
}

/// Spelling commands usable once per utterance, after the sequence.
fn nested() -> RuleSpec {
    let mut action_map = ActionMap::from([
        ("sign <numerals>".to_string(), Action::text("{numerals}")),
        ("print <letters>".to_string(), Action::text("{letters}")),
        (
            "shout <letters>".to_string(),
            Action::Format {
                convention: Convention::Upper,
                slot: "letters".into(),
                normalize: false,
                prefix: None,
                suffix: None,
            },
        ),
    ]);
    for (phrase, convention) in FORMATTERS {
        action_map.insert(
            format!("spell {phrase} <letters>"),
            Action::format(*convention, "letters"),
        );
    }
    RuleSpec {
        action_map,
        element_map: ElementMap::from([
            ("numerals".to_string(), ElementDef::new(spelled(NUMBERS, 1, 10))),
            ("letters".to_string(), ElementDef::new(spelled(LETTERS, 1, 10))),
        ]),
    }
}

/// Global keystrokes, formatting, "program" and spelling, in one table.
fn dictation(global: &EnvironmentSpec, nested: &RuleSpec) -> RuleSpec {
    RuleSpec {
        action_map: combine_maps(&[
            &global.action_map,
            &global.terminal_action_map,
            &nested.action_map,
        ]),
        element_map: combine_maps(&[&global.element_map, &nested.element_map]),
    }
}

/// Context-changing commands: nothing may run after them.
fn final_rule() -> RuleSpec {
    let mut action_map: ActionMap = WINDOWS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            (
                format!("go {name}"),
                Action::key(format!("win:down, {}:1/10, win:up", i + 1)),
            )
        })
        .collect();
    action_map.insert("swap [<n>]".into(), Action::key("alt:down, tab:{n}/25, alt:up"));
    RuleSpec {
        action_map,
        element_map: ElementMap::from([("n".to_string(), count(20))]),
    }
}
