//! Bounded log of rendered messages shared by frontends.
use std::collections::VecDeque;

use runtime::{Event, LifecycleEvent};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    /// Exits and failed withdraws stand out; everything else is info.
    pub fn of(event: &Event) -> Self {
        match event {
            Event::Lifecycle(LifecycleEvent::ExitFailed { .. }) => MessageLevel::Error,
            Event::Lifecycle(LifecycleEvent::Halted { .. }) => MessageLevel::Warning,
            _ => MessageLevel::Info,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageEntry {
    pub text: String,
    /// Ledger timestamp for log events, `None` for local events.
    pub timestamp: Option<u64>,
    pub level: MessageLevel,
}

impl MessageEntry {
    pub fn new(text: impl Into<String>, timestamp: Option<u64>, level: MessageLevel) -> Self {
        Self {
            text: text.into(),
            timestamp,
            level,
        }
    }
}

/// Oldest entries are dropped once `capacity` is reached.
#[derive(Clone, Debug)]
pub struct MessageLog {
    entries: VecDeque<MessageEntry>,
    capacity: usize,
    /// Entries pushed since the last `take_unseen`.
    unseen: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            unseen: 0,
        }
    }

    pub fn push(&mut self, entry: MessageEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.unseen = (self.unseen + 1).min(self.capacity);
    }

    pub fn push_text(&mut self, message: impl Into<String>) {
        self.push(MessageEntry::new(message, None, MessageLevel::Info));
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter().rev().take(limit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not yet handed out, oldest first.
    pub fn take_unseen(&mut self) -> Vec<MessageEntry> {
        let start = self.entries.len() - self.unseen;
        self.unseen = 0;
        self.entries.iter().skip(start).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_drops_oldest() {
        let mut log = MessageLog::new(2);
        for text in ["a", "b", "c"] {
            log.push_text(text);
        }
        let texts: Vec<_> = log.iter().map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[test]
    fn unseen_entries_are_handed_out_once() {
        let mut log = MessageLog::new(8);
        log.push_text("first");
        assert_eq!(log.take_unseen().len(), 1);

        log.push_text("second");
        log.push_text("third");
        let unseen: Vec<_> = log.take_unseen().into_iter().map(|e| e.text).collect();
        assert_eq!(unseen, ["second", "third"]);
        assert!(log.take_unseen().is_empty());
        assert_eq!(log.len(), 3);
    }
}
