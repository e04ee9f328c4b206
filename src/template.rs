use crate::element::{Extras, Value};
use crate::error::ActionError;
use std::collections::HashSet;

/// Extract placeholder names from an action template.
///
/// Finds `{name}` patterns and returns unique names in order of first
/// appearance. `{{` and `}}` are escapes for literal braces and are skipped.
pub(crate) fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    scan(template, |piece| {
        if let Piece::Slot(name) = piece
            && seen.insert(name.to_string())
        {
            names.push(name.to_string());
        }
    });
    names
}

/// Replace `{name}` placeholders with values from `extras`. A missing value
/// is an error.
pub(crate) fn render(template: &str, extras: &Extras) -> Result<String, ActionError> {
    let mut out = String::with_capacity(template.len());
    let mut missing = None;
    scan(template, |piece| match piece {
        Piece::Literal(s) => out.push_str(s),
        Piece::Slot(name) => match extras.get(name) {
            Some(Value::Int(n)) => out.push_str(&n.to_string()),
            Some(Value::Text(t)) => out.push_str(t),
            None => {
                if missing.is_none() {
                    missing = Some(name.to_string());
                }
            }
        },
    });
    match missing {
        Some(name) => Err(ActionError::MissingExtra(name)),
        None => Ok(out),
    }
}

enum Piece<'a> {
    Literal(&'a str),
    Slot(&'a str),
}

fn scan<'a>(template: &'a str, mut visit: impl FnMut(Piece<'a>)) {
    let mut rest = template;
    while let Some(open) = rest.find(['{', '}']) {
        let (before, tail) = rest.split_at(open);
        if !before.is_empty() {
            visit(Piece::Literal(before));
        }
        if tail.starts_with("{{") {
            visit(Piece::Literal("{"));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            visit(Piece::Literal("}"));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            // Stray closing brace, keep it
            visit(Piece::Literal("}"));
            rest = &tail[1..];
        } else if let Some(close) = tail[1..].find('}') {
            let name = &tail[1..1 + close];
            if name.is_empty() || name.contains('{') {
                visit(Piece::Literal(&tail[..2 + close]));
            } else {
                visit(Piece::Slot(name));
            }
            rest = &tail[2 + close..];
        } else {
            // No closing brace, rest is literal
            visit(Piece::Literal(tail));
            rest = "";
        }
    }
    if !rest.is_empty() {
        visit(Piece::Literal(rest));
    }
}
