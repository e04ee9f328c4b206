//! Key and mouse spec parsing.
//!
//! Specs use the compact notation of the command tables:
//!
//! - `"enter"`: press once
//! - `"c-left/5:3"`: ctrl+left three times, 50 ms after each press
//! - `"tab:2/25"`: tab twice, then pause 250 ms
//! - `"shift:down"` / `"shift:up"`: hold or release a key
//! - `"csa-m"`: ctrl+shift+alt+m
//!
//! Elements are comma separated. Pauses are in hundredths of a second.

use crate::backend::InputEvent;
use crate::error::ActionError;
use serde::{Deserialize, Serialize};

/// Spec that forces every modifier back up.
pub const RELEASE_SPEC: &str = "shift:up, ctrl:up, alt:up";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Win,
}

impl Modifier {
    fn from_code(code: char) -> Result<Self, ActionError> {
        match code {
            'c' => Ok(Modifier::Ctrl),
            's' => Ok(Modifier::Shift),
            'a' => Ok(Modifier::Alt),
            'w' => Ok(Modifier::Win),
            other => Err(ActionError::UnknownModifier(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    Click { count: u32 },
    Down,
    Up,
}

// --- Key names ---

const NAMED_KEYS: &[&str] = &[
    "enter", "tab", "space", "backspace", "del", "insert", "escape", "up", "down", "left",
    "right", "home", "end", "pgup", "pgdown", "apps", "shift", "ctrl", "alt", "win", "lparen",
    "rparen", "lbrace", "rbrace", "lbracket", "rbracket", "langle", "rangle", "semicolon",
    "colon", "comma", "dot", "slash", "backslash", "minus", "plus", "equal", "dquote", "squote",
    "hash", "at", "dollar", "percent", "caret", "ampersand", "star", "bar", "tilde",
    "underscore", "exclamation", "question", "backtick", "capslock", "printscreen", "pause",
    "npadd", "npsub", "npmul", "npdiv", "npdec", "volumeup", "volumedown", "mute",
];

/// Canonical name for `name`, or `None` if it is not a key.
fn canonical_key(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    let aliased = match lower.as_str() {
        "esc" => "escape",
        "delete" => "del",
        "control" => "ctrl",
        "return" => "enter",
        "pageup" => "pgup",
        "pagedown" => "pgdown",
        "popup" => "apps",
        "lt" => "langle",
        "gt" => "rangle",
        "period" => "dot",
        "hyphen" => "minus",
        "equals" => "equal",
        "quote" => "squote",
        "and" => "ampersand",
        "asterisk" => "star",
        "pipe" => "bar",
        "bang" => "exclamation",
        other => other,
    };
    let mut chars = aliased.chars();
    let single = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphanumeric());
    let function = aliased
        .strip_prefix('f')
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=24).contains(&n));
    let numpad = aliased
        .strip_prefix("np")
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| n <= 9);
    (single || function || numpad || NAMED_KEYS.contains(&aliased)).then(|| aliased.to_string())
}

/// Pause value in hundredths of a second → milliseconds.
fn parse_pause(raw: &str, element: &str) -> Result<u64, ActionError> {
    let hundredths: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ActionError::InvalidKeySpec(element.to_string()))?;
    if !hundredths.is_finite() || hundredths < 0.0 {
        return Err(ActionError::InvalidKeySpec(element.to_string()));
    }
    Ok((hundredths * 10.0).round() as u64)
}

/// Split `name[/pause]`.
fn split_pause<'a>(part: &'a str, element: &str) -> Result<(&'a str, u64), ActionError> {
    match part.split_once('/') {
        Some((head, pause)) => Ok((head.trim(), parse_pause(pause, element)?)),
        None => Ok((part.trim(), 0)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stroke {
    Press { repeat: u32, spacing_ms: u64 },
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyElement {
    modifiers: Vec<Modifier>,
    key: String,
    stroke: Stroke,
    pause_ms: u64,
}

fn parse_element(element: &str) -> Result<KeyElement, ActionError> {
    let invalid = || ActionError::InvalidKeySpec(element.to_string());
    let trimmed = element.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    // "cs-t": modifier codes before the first dash
    let (modifiers, body) = match trimmed.split_once('-') {
        Some((codes, rest)) if !codes.is_empty() && !rest.is_empty() => {
            let modifiers = codes
                .chars()
                .map(Modifier::from_code)
                .collect::<Result<Vec<_>, _>>()?;
            (modifiers, rest)
        }
        _ => (Vec::new(), trimmed),
    };

    let (name, stroke, pause_ms) = match body.split_once(':') {
        None => {
            let (name, pause) = split_pause(body, element)?;
            (
                name,
                Stroke::Press {
                    repeat: 1,
                    spacing_ms: 0,
                },
                pause,
            )
        }
        Some((head, tail)) => {
            let (name, spacing_ms) = split_pause(head, element)?;
            let (what, pause) = split_pause(tail, element)?;
            let stroke = match what {
                "down" => Stroke::Down,
                "up" => Stroke::Up,
                count => Stroke::Press {
                    repeat: count.parse().map_err(|_| invalid())?,
                    spacing_ms,
                },
            };
            // "shift/5:down" has nowhere to put the inner pause
            if matches!(stroke, Stroke::Down | Stroke::Up) && spacing_ms > 0 {
                return Err(invalid());
            }
            (name, stroke, pause)
        }
    };

    let key = canonical_key(name).ok_or_else(|| ActionError::UnknownKey(name.to_string()))?;
    if !modifiers.is_empty() && !matches!(stroke, Stroke::Press { .. }) {
        return Err(invalid());
    }
    Ok(KeyElement {
        modifiers,
        key,
        stroke,
        pause_ms,
    })
}

impl KeyElement {
    fn push_events(&self, out: &mut Vec<InputEvent>) {
        match self.stroke {
            Stroke::Press { repeat, spacing_ms } => {
                for _ in 0..repeat {
                    out.push(InputEvent::KeyPress {
                        key: self.key.clone(),
                        modifiers: self.modifiers.clone(),
                    });
                    if spacing_ms > 0 {
                        out.push(InputEvent::Pause { ms: spacing_ms });
                    }
                }
            }
            Stroke::Down => out.push(InputEvent::KeyDown {
                key: self.key.clone(),
            }),
            Stroke::Up => out.push(InputEvent::KeyUp {
                key: self.key.clone(),
            }),
        }
        if self.pause_ms > 0 {
            out.push(InputEvent::Pause { ms: self.pause_ms });
        }
    }
}

/// Parse a key spec into the input events it produces.
pub fn key_events(spec: &str) -> Result<Vec<InputEvent>, ActionError> {
    let mut events = Vec::new();
    for element in spec.split(',') {
        parse_element(element)?.push_events(&mut events);
    }
    Ok(events)
}

/// Parse a mouse spec such as `"left"`, `"left:2"`, `"left:down"`, `"right/10"`.
pub fn mouse_events(spec: &str) -> Result<Vec<InputEvent>, ActionError> {
    let mut events = Vec::new();
    for element in spec.split(',') {
        let invalid = || ActionError::InvalidMouseSpec(element.trim().to_string());
        let (body, pause_ms) = match element.split_once('/') {
            Some((body, pause)) => (
                body.trim(),
                parse_pause(pause, element).map_err(|_| invalid())?,
            ),
            None => (element.trim(), 0),
        };
        let (name, what) = body.split_once(':').unwrap_or((body, "1"));
        let button = match name.trim() {
            "left" => MouseButton::Left,
            "right" => MouseButton::Right,
            "middle" => MouseButton::Middle,
            _ => return Err(invalid()),
        };
        let action = match what.trim() {
            "down" => MouseAction::Down,
            "up" => MouseAction::Up,
            count => MouseAction::Click {
                count: count.parse().map_err(|_| invalid())?,
            },
        };
        events.push(InputEvent::MouseButton { button, action });
        if pause_ms > 0 {
            events.push(InputEvent::Pause { ms: pause_ms });
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str, modifiers: &[Modifier]) -> InputEvent {
        InputEvent::KeyPress {
            key: key.into(),
            modifiers: modifiers.to_vec(),
        }
    }

    #[test]
    fn single_key() {
        assert_eq!(key_events("enter").unwrap(), vec![press("enter", &[])]);
    }

    #[test]
    fn modifiers_and_repeat_with_spacing() {
        let events = key_events("c-left/5:2").unwrap();
        assert_eq!(
            events,
            vec![
                press("left", &[Modifier::Ctrl]),
                InputEvent::Pause { ms: 50 },
                press("left", &[Modifier::Ctrl]),
                InputEvent::Pause { ms: 50 },
            ]
        );
    }

    #[test]
    fn repeat_then_outer_pause() {
        let events = key_events("tab:2/25").unwrap();
        assert_eq!(
            events,
            vec![
                press("tab", &[]),
                press("tab", &[]),
                InputEvent::Pause { ms: 250 }
            ]
        );
    }

    #[test]
    fn hold_and_release() {
        let events = key_events("alt:down, tab, alt:up").unwrap();
        assert_eq!(
            events,
            vec![
                InputEvent::KeyDown { key: "alt".into() },
                press("tab", &[]),
                InputEvent::KeyUp { key: "alt".into() },
            ]
        );
    }

    #[test]
    fn release_spec_lifts_all_modifiers() {
        let events = key_events(RELEASE_SPEC).unwrap();
        assert_eq!(
            events,
            vec![
                InputEvent::KeyUp { key: "shift".into() },
                InputEvent::KeyUp { key: "ctrl".into() },
                InputEvent::KeyUp { key: "alt".into() },
            ]
        );
    }

    #[test]
    fn combined_modifiers() {
        let events = key_events("csa-m").unwrap();
        assert_eq!(
            events,
            vec![press("m", &[Modifier::Ctrl, Modifier::Shift, Modifier::Alt])]
        );
    }

    #[test]
    fn aliases_are_canonicalized() {
        assert_eq!(key_events("esc").unwrap(), vec![press("escape", &[])]);
        assert_eq!(key_events("delete").unwrap(), vec![press("del", &[])]);
        assert_eq!(key_events("f12").unwrap(), vec![press("f12", &[])]);
        assert_eq!(key_events("np9").unwrap(), vec![press("np9", &[])]);
    }

    #[test]
    fn zero_repeat_produces_nothing() {
        assert!(key_events("up:0").unwrap().is_empty());
    }

    #[test]
    fn errors() {
        assert_eq!(
            key_events("enterr"),
            Err(ActionError::UnknownKey("enterr".into()))
        );
        assert_eq!(key_events("q-x"), Err(ActionError::UnknownModifier('q')));
        assert!(matches!(
            key_events("up:many"),
            Err(ActionError::InvalidKeySpec(_))
        ));
        assert!(matches!(
            key_events("up/x"),
            Err(ActionError::InvalidKeySpec(_))
        ));
        assert!(matches!(key_events(""), Err(ActionError::InvalidKeySpec(_))));
        assert!(matches!(
            key_events("c-shift:down"),
            Err(ActionError::InvalidKeySpec(_))
        ));
    }

    #[test]
    fn mouse_clicks_and_drags() {
        assert_eq!(
            mouse_events("left:2").unwrap(),
            vec![InputEvent::MouseButton {
                button: MouseButton::Left,
                action: MouseAction::Click { count: 2 },
            }]
        );
        assert_eq!(
            mouse_events("left:down/10, left:up").unwrap(),
            vec![
                InputEvent::MouseButton {
                    button: MouseButton::Left,
                    action: MouseAction::Down,
                },
                InputEvent::Pause { ms: 100 },
                InputEvent::MouseButton {
                    button: MouseButton::Left,
                    action: MouseAction::Up,
                },
            ]
        );
        assert!(mouse_events("thumb").is_err());
    }
}
