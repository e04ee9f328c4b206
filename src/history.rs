//! Recently processed utterances.
//!
//! Keeps the last `capacity` outcomes in a circular buffer so a host can show
//! what was heard and what happened without scraping the log.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Executed,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub timestamp_ms: i64,
    /// Top-level rule that handled the utterance, if any was active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub phrases: Vec<String>,
    pub repeat: u32,
    pub outcome: Outcome,
}

/// Fixed-capacity circular buffer of `HistoryEntry`.
#[derive(Debug)]
pub struct History {
    slots: Vec<Option<HistoryEntry>>,
    /// Next slot to overwrite
    write_pos: usize,
    len: usize,
    next_id: u64,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity.max(1), || None);
        Self {
            slots,
            write_pos: 0,
            len: 0,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Record an outcome, evicting the oldest entry when full. Returns its id.
    pub fn record(
        &mut self,
        rule: Option<String>,
        phrases: Vec<String>,
        repeat: u32,
        outcome: Outcome,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots[self.write_pos] = Some(HistoryEntry {
            id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            rule,
            phrases,
            repeat,
            outcome,
        });
        self.write_pos = (self.write_pos + 1) % self.capacity();
        self.len = (self.len + 1).min(self.capacity());
        id
    }

    /// The most recent `limit` entries, oldest first. `0` means all.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let take = if limit == 0 { self.len } else { limit.min(self.len) };
        let oldest = if self.len < self.capacity() { 0 } else { self.write_pos };
        (self.len - take..self.len)
            .filter_map(|i| self.slots[(oldest + i) % self.capacity()].clone())
            .collect()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.write_pos + self.capacity() - 1) % self.capacity();
        self.slots[idx].as_ref()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
