//! Frontend configuration structures and loaders.
//!
//! Presentation settings shared by every frontend: how many messages to
//! keep and which event topics produce visible messages at all.

use std::env;

use runtime::{Event, Topic};

#[derive(Clone, Debug, Default)]
pub struct FrontendConfig {
    pub messages: MessageConfig,
}

impl FrontendConfig {
    pub const fn new(messages: MessageConfig) -> Self {
        Self { messages }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CLI_MESSAGE_CAPACITY` - Message log capacity (default: 64)
    /// - `SHOW_BATTLE_MESSAGES` - Damage, heals and status effects (default: true)
    /// - `SHOW_PROTOCOL_MESSAGES` - Commits, reveals, game over (default: true)
    /// - `SHOW_TURN_MESSAGES` - Local submission progress (default: false)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("CLI_MESSAGE_CAPACITY") {
            config.messages.capacity = capacity.max(1);
        }

        let visibility = &mut config.messages.visibility;
        if let Some(show) = read_env_bool("SHOW_BATTLE_MESSAGES") {
            visibility.show_battle = show;
        }
        if let Some(show) = read_env_bool("SHOW_PROTOCOL_MESSAGES") {
            visibility.show_protocol = show;
        }
        if let Some(show) = read_env_bool("SHOW_TURN_MESSAGES") {
            visibility.show_turn = show;
        }

        config
    }
}

#[derive(Clone, Debug)]
pub struct MessageConfig {
    pub capacity: usize,
    pub visibility: EventVisibility,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            visibility: EventVisibility::default(),
        }
    }
}

/// Controls which event topics generate visible messages.
///
/// Lifecycle events (exits, halts) are always shown.
#[derive(Clone, Debug)]
pub struct EventVisibility {
    pub show_battle: bool,
    pub show_protocol: bool,
    /// Local turn progress; noisy, mostly useful when debugging.
    pub show_turn: bool,
}

impl Default for EventVisibility {
    fn default() -> Self {
        Self {
            show_battle: true,
            show_protocol: true,
            show_turn: false,
        }
    }
}

impl EventVisibility {
    pub fn should_show(&self, event: &Event) -> bool {
        match event.topic() {
            Topic::Battle => self.show_battle,
            Topic::Protocol => self.show_protocol,
            Topic::Turn => self.show_turn,
            Topic::Lifecycle => true,
        }
    }

    /// Topics worth subscribing to under this visibility.
    pub fn topics(&self) -> Vec<Topic> {
        Topic::ALL
            .into_iter()
            .filter(|topic| match topic {
                Topic::Battle => self.show_battle,
                Topic::Protocol => self.show_protocol,
                Topic::Turn => self.show_turn,
                Topic::Lifecycle => true,
            })
            .collect()
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
