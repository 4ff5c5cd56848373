//! Rolling per-channel message memory used to judge a callout target.

use serenity::all::ChannelId;
use std::collections::{HashMap, VecDeque};

/// What a snapshot yields for a channel nobody has spoken in.
pub const EMPTY_SNAPSHOT: &str = "No history recorded yet.";

/// One observed message.  Immutable once recorded.
#[derive(Clone)]
pub struct MemoryEntry {
    pub author_name: String,
    pub content: String,
}

/// Fixed-capacity message memory, one buffer per channel.
///
/// Buffers are created lazily on first record and live for the process lifetime.  Insertion
/// order is the only meaningful order; the most recent entry is last.
pub struct Memory(HashMap<ChannelId, VecDeque<MemoryEntry>>);

impl Memory {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Append one observed message, evicting the oldest entries once the channel's buffer
    /// exceeds `capacity`.
    ///
    /// Capacity is passed per call so a config change applies on the next message.
    pub fn record(
        &mut self,
        scope: ChannelId,
        author_name: String,
        content: String,
        capacity: usize,
    ) {
        let buffer = self.0.entry(scope).or_default();
        buffer.push_back(MemoryEntry {
            author_name,
            content,
        });
        while buffer.len() > capacity {
            buffer.pop_front();
        }
    }

    /// Detached copy of a channel's history as `name: text` lines, oldest first.
    ///
    /// Later records cannot affect a snapshot already handed out.  Unknown channels yield the
    /// same placeholder as empty ones.
    pub fn snapshot(&self, scope: ChannelId) -> String {
        match self.0.get(&scope) {
            Some(buffer) if !buffer.is_empty() => buffer
                .iter()
                .map(|entry| format!("{}: {}", entry.author_name, entry.content))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => EMPTY_SNAPSHOT.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_n(memory: &mut Memory, scope: ChannelId, range: std::ops::Range<usize>, cap: usize) {
        for i in range {
            memory.record(scope, format!("user{}", i), format!("message {}", i), cap);
        }
    }

    #[test]
    fn unknown_scope_yields_placeholder() {
        let memory = Memory::new();
        assert_eq!(memory.snapshot(ChannelId::new(1)), EMPTY_SNAPSHOT);
    }

    #[test]
    fn snapshot_preserves_arrival_order() {
        let scope = ChannelId::new(1);
        let mut memory = Memory::new();
        record_n(&mut memory, scope, 0..3, 20);

        assert_eq!(
            memory.snapshot(scope),
            "user0: message 0\nuser1: message 1\nuser2: message 2"
        );
    }

    #[test]
    fn eviction_is_strict_fifo() {
        let scope = ChannelId::new(1);
        let mut memory = Memory::new();
        record_n(&mut memory, scope, 0..25, 20);

        let snapshot = memory.snapshot(scope);
        let lines: Vec<&str> = snapshot.lines().collect();
        assert_eq!(lines.len(), 20);
        // Exactly the last 20, oldest first.
        assert_eq!(lines[0], "user5: message 5");
        assert_eq!(lines[19], "user24: message 24");
    }

    #[test]
    fn latest_record_is_always_last() {
        let scope = ChannelId::new(1);
        let other = ChannelId::new(2);
        let mut memory = Memory::new();
        record_n(&mut memory, scope, 0..5, 3);
        memory.record(other, "bystander".into(), "unrelated".into(), 3);
        memory.record(scope, "ann".into(), "the newest thing".into(), 3);

        let snapshot = memory.snapshot(scope);
        assert_eq!(snapshot.lines().last(), Some("ann: the newest thing"));
    }

    #[test]
    fn scopes_are_isolated() {
        let a = ChannelId::new(1);
        let b = ChannelId::new(2);
        let mut memory = Memory::new();
        memory.record(a, "ann".into(), "hello".into(), 20);

        assert_eq!(memory.snapshot(a), "ann: hello");
        assert_eq!(memory.snapshot(b), EMPTY_SNAPSHOT);
    }

    #[test]
    fn snapshot_is_detached_from_later_records() {
        let scope = ChannelId::new(1);
        let mut memory = Memory::new();
        memory.record(scope, "ann".into(), "first".into(), 20);

        let before = memory.snapshot(scope);
        memory.record(scope, "bob".into(), "second".into(), 20);

        assert_eq!(before, "ann: first");
        assert_eq!(memory.snapshot(scope), "ann: first\nbob: second");
    }

    #[test]
    fn shrinking_capacity_applies_on_next_record() {
        let scope = ChannelId::new(1);
        let mut memory = Memory::new();
        record_n(&mut memory, scope, 0..10, 10);
        memory.record(scope, "ann".into(), "squeeze".into(), 4);

        assert_eq!(memory.snapshot(scope).lines().count(), 4);
    }
}
