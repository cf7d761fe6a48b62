//! Utilities for reacting to runtime events inside UI layers.
use battle_core::{Address, MoveCatalog};
use runtime::{Event, LifecycleEvent};

use crate::config::MessageConfig;
use crate::format::Describer;
use crate::message::{MessageEntry, MessageLevel, MessageLog};

#[derive(Clone, Copy, Debug, Default)]
pub struct EventImpact {
    /// A new message was logged.
    pub logged: bool,
    /// The synchronizer is done with the match.
    pub match_ended: bool,
}

impl EventImpact {
    pub const fn none() -> Self {
        Self {
            logged: false,
            match_ended: false,
        }
    }

    pub fn combine(self, other: Self) -> Self {
        Self {
            logged: self.logged || other.logged,
            match_ended: self.match_ended || other.match_ended,
        }
    }
}

pub trait EventConsumer {
    fn on_event(&mut self, event: &Event) -> EventImpact;
    fn message_log(&self) -> &MessageLog;
    fn message_log_mut(&mut self) -> &mut MessageLog;
    fn take_message_log(self) -> MessageLog
    where
        Self: Sized;
}

/// Turns visible events into log messages.
pub struct MessageConsumer {
    catalog: MoveCatalog,
    me: Option<Address>,
    config: MessageConfig,
    log: MessageLog,
}

impl MessageConsumer {
    pub fn new(catalog: MoveCatalog, me: Option<Address>, config: MessageConfig) -> Self {
        let log = MessageLog::new(config.capacity);
        Self {
            catalog,
            me,
            config,
            log,
        }
    }
}

impl EventConsumer for MessageConsumer {
    fn on_event(&mut self, event: &Event) -> EventImpact {
        let match_ended = is_match_end(event);
        if !self.config.visibility.should_show(event) {
            return EventImpact {
                logged: false,
                match_ended,
            };
        }

        let timestamp = match event {
            Event::Battle(decoded) | Event::Protocol(decoded) => Some(decoded.timestamp),
            Event::Turn(_) | Event::Lifecycle(_) => None,
        };
        let text = Describer::new(&self.catalog, self.me).describe(event);
        self.log
            .push(MessageEntry::new(text, timestamp, MessageLevel::of(event)));

        EventImpact {
            logged: true,
            match_ended,
        }
    }

    fn message_log(&self) -> &MessageLog {
        &self.log
    }

    fn message_log_mut(&mut self) -> &mut MessageLog {
        &mut self.log
    }

    fn take_message_log(self) -> MessageLog {
        self.log
    }
}

/// True for lifecycle events that end a match's synchronizer.
pub fn is_match_end(event: &Event) -> bool {
    matches!(
        event,
        Event::Lifecycle(LifecycleEvent::Exited { .. } | LifecycleEvent::Halted { .. })
    )
}
