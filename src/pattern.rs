//! Phrase patterns for command tables.
//!
//! Syntax: literal words, `<name>` element slots, `[optional]`, `(group)`
//! and `a|b` alternatives. `"up [<n>]"`, `"escape|quit"`,
//! `"(close|kill) tab"`.

use crate::element::{ElementMap, Extras};
use crate::error::PatternError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Word(String),
    Slot(String),
    Optional(Box<Node>),
    Seq(Vec<Node>),
    Alt(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Slot(String),
    Open(char),
    Close(char, usize),
    Bar,
}

fn lex(source: &str) -> Result<Vec<Token>, PatternError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '<' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '>' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(PatternError::Unbalanced('<'));
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(PatternError::EmptySlot(offset));
                }
                tokens.push(Token::Slot(name.to_string()));
            }
            '>' => return Err(PatternError::Unexpected { found: c, offset }),
            '[' | '(' => tokens.push(Token::Open(c)),
            ']' | ')' => tokens.push(Token::Close(c, offset)),
            '|' => tokens.push(Token::Bar),
            _ => {
                let mut word = c.to_string();
                while let Some(&(_, n)) = chars.peek() {
                    if n.is_whitespace() || "<>[]()|".contains(n) {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }
                tokens.push(Token::Word(word.to_lowercase()));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Alternatives up to `closer` (or end of input when `None`).
    fn alternatives(&mut self, closer: Option<char>) -> Result<Node, PatternError> {
        let mut options = Vec::new();
        let mut saw_bar = false;
        loop {
            let seq = self.sequence()?;
            let next = self.tokens.get(self.pos).cloned();
            let ends = !matches!(next, Some(Token::Bar));
            if seq.is_empty() && (saw_bar || !ends || closer.is_some()) {
                return Err(PatternError::EmptyAlternative);
            }
            options.push(Node::Seq(seq));
            match next {
                Some(Token::Bar) => {
                    saw_bar = true;
                    self.pos += 1;
                }
                Some(Token::Close(found, offset)) => {
                    return match closer {
                        Some(expected) if expected == found => {
                            self.pos += 1;
                            Ok(collapse(options))
                        }
                        _ => Err(PatternError::Unexpected { found, offset }),
                    };
                }
                _ => {
                    return match closer {
                        Some(']') => Err(PatternError::Unbalanced('[')),
                        Some(_) => Err(PatternError::Unbalanced('(')),
                        None => Ok(collapse(options)),
                    };
                }
            }
        }
    }

    fn sequence(&mut self) -> Result<Vec<Node>, PatternError> {
        let mut items = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).cloned() {
            match token {
                Token::Word(w) => {
                    self.pos += 1;
                    items.push(Node::Word(w));
                }
                Token::Slot(name) => {
                    self.pos += 1;
                    items.push(Node::Slot(name));
                }
                Token::Open(open) => {
                    self.pos += 1;
                    if open == '[' {
                        let inner = self.alternatives(Some(']'))?;
                        items.push(Node::Optional(Box::new(inner)));
                    } else {
                        items.push(self.alternatives(Some(')'))?);
                    }
                }
                Token::Close(..) | Token::Bar => break,
            }
        }
        Ok(items)
    }
}

fn collapse(mut options: Vec<Node>) -> Node {
    if options.len() == 1 {
        options.pop().unwrap_or(Node::Seq(Vec::new()))
    } else {
        Node::Alt(options)
    }
}

/// A parsed phrase pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    root: Node,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut parser = Parser {
            tokens: lex(source)?,
            pos: 0,
        };
        let root = if parser.tokens.is_empty() {
            Node::Seq(Vec::new())
        } else {
            parser.alternatives(None)?
        };
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Matches only the empty phrase.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            root: Node::Seq(Vec::new()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of literal words, a rough measure of how specific the pattern is.
    pub fn literal_words(&self) -> usize {
        count_words(&self.root)
    }

    /// Element names referenced as `<name>`, in order of appearance.
    pub fn references(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_slots(&self.root, &mut names);
        names
    }

    /// Element names bound on every path through the pattern, i.e. outside
    /// `[...]` and in every branch of an alternative.
    pub fn required_references(&self) -> Vec<String> {
        required_slots(&self.root).into_iter().collect()
    }

    /// Match the whole of `words`. On success returns the captured values,
    /// with element defaults filled in for slots that were not spoken.
    pub fn match_phrase(&self, words: &[String], elements: &ElementMap) -> Option<Extras> {
        let mut found = None;
        let mut extras = Extras::new();
        match_node(
            &self.root,
            words,
            0,
            &mut extras,
            elements,
            &mut |end: usize, extras: &mut Extras| {
                if end == words.len() {
                    found = Some(extras.clone());
                    true
                } else {
                    false
                }
            },
        );
        let mut extras = found?;
        for name in self.references() {
            if !extras.contains_key(&name)
                && let Some(default) = elements.get(&name).and_then(|def| def.default.clone())
            {
                extras.insert(name, default);
            }
        }
        Some(extras)
    }
}

fn count_words(node: &Node) -> usize {
    match node {
        Node::Word(_) => 1,
        Node::Slot(_) => 0,
        Node::Optional(inner) => count_words(inner),
        Node::Seq(nodes) => nodes.iter().map(count_words).sum(),
        Node::Alt(nodes) => nodes.iter().map(count_words).max().unwrap_or(0),
    }
}

fn required_slots(node: &Node) -> BTreeSet<String> {
    match node {
        Node::Word(_) | Node::Optional(_) => BTreeSet::new(),
        Node::Slot(name) => BTreeSet::from([name.clone()]),
        Node::Seq(nodes) => nodes.iter().flat_map(required_slots).collect(),
        Node::Alt(nodes) => {
            let mut options = nodes.iter().map(required_slots);
            let first = options.next().unwrap_or_default();
            options.fold(first, |acc, slots| acc.intersection(&slots).cloned().collect())
        }
    }
}

fn collect_slots(node: &Node, names: &mut Vec<String>) {
    match node {
        Node::Word(_) => {}
        Node::Slot(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Node::Optional(inner) => collect_slots(inner, names),
        Node::Seq(nodes) | Node::Alt(nodes) => {
            for n in nodes {
                collect_slots(n, names);
            }
        }
    }
}

type Continuation<'a> = dyn FnMut(usize, &mut Extras) -> bool + 'a;

/// Backtracking matcher in continuation-passing style: `next` is called
/// with the position after `node` and returns true to accept.
fn match_node(
    node: &Node,
    words: &[String],
    pos: usize,
    extras: &mut Extras,
    elements: &ElementMap,
    next: &mut Continuation<'_>,
) -> bool {
    match node {
        Node::Word(word) => {
            pos < words.len() && words[pos].to_lowercase() == *word && next(pos + 1, extras)
        }
        Node::Slot(name) => {
            let Some(def) = elements.get(name) else {
                return false;
            };
            for (len, value) in def.element.candidates(&words[pos..]) {
                let previous = extras.insert(name.clone(), value);
                if next(pos + len, extras) {
                    return true;
                }
                match previous {
                    Some(v) => extras.insert(name.clone(), v),
                    None => extras.remove(name),
                };
            }
            false
        }
        Node::Optional(inner) => {
            match_node(inner, words, pos, extras, elements, next) || next(pos, extras)
        }
        Node::Seq(items) => match_seq(items, words, pos, extras, elements, next),
        Node::Alt(options) => options
            .iter()
            .any(|option| match_node(option, words, pos, extras, elements, next)),
    }
}

fn match_seq(
    items: &[Node],
    words: &[String],
    pos: usize,
    extras: &mut Extras,
    elements: &ElementMap,
    next: &mut Continuation<'_>,
) -> bool {
    match items.split_first() {
        None => next(pos, extras),
        Some((first, rest)) => match_node(first, words, pos, extras, elements, &mut |p: usize, ex: &mut Extras| {
            match_seq(rest, words, p, ex, elements, next)
        }),
    }
}
