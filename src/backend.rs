//! The boundary to the OS input-injection layer.
//!
//! The core only decides which primitive events happen and in what order.
//! Delivering them (SendInput, XTest, CGEvent...) is the job of a `Backend`.

use crate::error::BackendError;
use crate::keys::{Modifier, MouseAction, MouseButton};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

/// One primitive input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    KeyPress {
        key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<Modifier>,
    },
    KeyDown {
        key: String,
    },
    KeyUp {
        key: String,
    },
    /// Type text character by character
    Type {
        text: String,
    },
    /// Bulk text: open, clear, write and close the clipboard, then send the
    /// paste chord. Backends must perform this as one indivisible unit.
    ClipboardPaste {
        text: String,
    },
    MouseButton {
        button: MouseButton,
        action: MouseAction,
    },
    MouseMove {
        x: i32,
        y: i32,
    },
    Pause {
        ms: u64,
    },
}

/// Sink for primitive input events. Implementations deliver each event
/// before returning; an error aborts the current recognition.
pub trait Backend {
    fn send(&mut self, event: InputEvent) -> Result<(), BackendError>;
}

/// Collects events in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<InputEvent>,
    /// Reject the n-th event (0-based) to simulate an injection failure
    fail_at: Option<usize>,
    sent: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Events with pauses filtered out.
    pub fn without_pauses(&self) -> Vec<InputEvent> {
        self.events
            .iter()
            .filter(|e| !matches!(e, InputEvent::Pause { .. }))
            .cloned()
            .collect()
    }
}

impl Backend for RecordingBackend {
    fn send(&mut self, event: InputEvent) -> Result<(), BackendError> {
        let index = self.sent;
        self.sent += 1;
        if self.fail_at == Some(index) {
            return Err(BackendError::Rejected(format!("{event:?}")));
        }
        self.events.push(event);
        Ok(())
    }
}

/// Writes one JSON object per event, for an external injector to consume.
pub struct JsonLinesBackend<W: Write> {
    writer: W,
    /// Sleep on `Pause` events instead of only forwarding them
    realtime: bool,
}

impl<W: Write> JsonLinesBackend<W> {
    pub fn new(writer: W, realtime: bool) -> Self {
        Self { writer, realtime }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Backend for JsonLinesBackend<W> {
    fn send(&mut self, event: InputEvent) -> Result<(), BackendError> {
        if let InputEvent::Pause { ms } = event
            && self.realtime
        {
            self.writer
                .flush()
                .map_err(|e| BackendError::Io(e.to_string()))?;
            std::thread::sleep(Duration::from_millis(ms));
            return Ok(());
        }
        let line = serde_json::to_string(&event).map_err(|e| BackendError::Io(e.to_string()))?;
        writeln!(self.writer, "{line}").map_err(|e| BackendError::Io(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| BackendError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_backend_keeps_order() {
        let mut backend = RecordingBackend::new();
        backend.send(InputEvent::Type { text: "a".into() }).unwrap();
        backend.send(InputEvent::Pause { ms: 50 }).unwrap();
        backend.send(InputEvent::Type { text: "b".into() }).unwrap();
        assert_eq!(backend.events.len(), 3);
        assert_eq!(
            backend.without_pauses(),
            vec![
                InputEvent::Type { text: "a".into() },
                InputEvent::Type { text: "b".into() }
            ]
        );
    }

    #[test]
    fn recording_backend_can_fail() {
        let mut backend = RecordingBackend::failing_at(1);
        assert!(backend.send(InputEvent::Pause { ms: 1 }).is_ok());
        assert!(matches!(
            backend.send(InputEvent::Pause { ms: 2 }),
            Err(BackendError::Rejected(_))
        ));
        assert!(backend.send(InputEvent::Pause { ms: 3 }).is_ok());
        assert_eq!(backend.events.len(), 2);
    }

    #[test]
    fn json_lines_format() {
        let mut backend = JsonLinesBackend::new(Vec::new(), false);
        backend
            .send(InputEvent::KeyPress {
                key: "s".into(),
                modifiers: vec![Modifier::Ctrl],
            })
            .unwrap();
        backend.send(InputEvent::KeyPress { key: "enter".into(), modifiers: vec![] }).unwrap();
        backend.send(InputEvent::Pause { ms: 50 }).unwrap();
        let out = String::from_utf8(backend.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], r#"{"event":"key_press","key":"s","modifiers":["ctrl"]}"#);
        assert_eq!(lines[1], r#"{"event":"key_press","key":"enter"}"#);
        assert_eq!(lines[2], r#"{"event":"pause","ms":50}"#);
    }

    #[test]
    fn mouse_event_serialization() {
        let json = serde_json::to_string(&InputEvent::MouseButton {
            button: MouseButton::Left,
            action: MouseAction::Click { count: 2 },
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"mouse_button","button":"left","action":{"click":{"count":2}}}"#
        );
    }
}
