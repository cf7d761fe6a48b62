//! Human-readable descriptions of ledger and runtime events.
//!
//! Every frontend renders the same sentences:
//! - Battle: "Monster #4 takes 25 damage from Monster #3's Control Move (critical)"
//! - Protocol: "Opponent 0x12ab…cd34 committed a move"
//! - Turn/Lifecycle: "Round 3: revealed Heal Move", "Left match#7: game over"

use battle_core::{Address, DecodedEvent, EventKind, MoveCatalog};
use runtime::{Event, LifecycleEvent, SyncState, TurnEvent};

/// Formatting context: the catalog for move names and who "you" are.
#[derive(Clone, Copy, Debug)]
pub struct Describer<'a> {
    pub catalog: &'a MoveCatalog,
    pub me: Option<Address>,
}

impl<'a> Describer<'a> {
    pub fn new(catalog: &'a MoveCatalog, me: Option<Address>) -> Self {
        Self { catalog, me }
    }

    pub fn describe(&self, event: &Event) -> String {
        match event {
            Event::Battle(event) | Event::Protocol(event) => self.describe_ledger(event),
            Event::Turn(event) => self.describe_turn(event),
            Event::Lifecycle(event) => describe_lifecycle(event),
        }
    }

    pub fn describe_ledger(&self, event: &DecodedEvent) -> String {
        let catalog = self.catalog;
        match &event.kind {
            EventKind::Damage {
                mv,
                attacker,
                defender,
                damage,
                elemental_multiplier,
                is_critical,
            } => {
                let mut notes = Vec::new();
                if *is_critical {
                    notes.push("critical");
                }
                if let Some(note) = effectiveness(*elemental_multiplier) {
                    notes.push(note);
                }
                let suffix = if notes.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", notes.join(", "))
                };
                format!(
                    "{} takes {damage} damage from {}'s {}{suffix}",
                    monster_label(*defender),
                    monster_label(*attacker),
                    catalog.move_label(*mv),
                )
            }
            EventKind::Heal { mv, monster, amount } => format!(
                "{} heals {amount} with {}",
                monster_label(*monster),
                catalog.move_label(*mv)
            ),
            EventKind::AddStatusEffect {
                effect,
                monster,
                remaining_turns,
            } => format!(
                "{} gains {} for {remaining_turns} turns",
                monster_label(*monster),
                catalog.effect_label(*effect)
            ),
            EventKind::ApplyMonsterStatusEffect { effect, monster, .. } => format!(
                "{} is affected by {}",
                monster_label(*monster),
                catalog.effect_label(*effect)
            ),
            EventKind::ApplyMoveStatusEffect { effect, mv, is_hit } => format!(
                "{} {} {}",
                catalog.effect_label(*effect),
                if *is_hit { "alters" } else { "misses" },
                catalog.move_label(*mv)
            ),
            EventKind::ApplyOtherStatusEffect { effect, is_hit } => format!(
                "{} {}",
                catalog.effect_label(*effect),
                if *is_hit { "takes effect" } else { "has no effect" }
            ),
            EventKind::RemoveStatusEffectsByGroup { mv, monster, group } => format!(
                "{} loses group {group} effects to {}",
                monster_label(*monster),
                catalog.move_label(*mv)
            ),
            EventKind::CommitMove { player, .. } => {
                format!("{} committed a move", self.participant_label(*player))
            }
            EventKind::RevealMove { player, mv } => format!(
                "{} revealed {}",
                self.participant_label(*player),
                catalog.move_label(*mv)
            ),
            EventKind::FirstStriker { monster } => {
                format!("{} strikes first", monster_label(*monster))
            }
            EventKind::GameOver { winner } => match self.me {
                Some(me) if me == *winner => "Game over: you won".to_string(),
                Some(_) => format!("Game over: {} won", short_address(*winner)),
                None => format!("Game over: winner {}", short_address(*winner)),
            },
        }
    }

    fn describe_turn(&self, event: &TurnEvent) -> String {
        match event {
            TurnEvent::MoveRequested { round, .. } => format!("Round {round}: choose a move"),
            TurnEvent::MoveCommitted {
                round, mv, persisted, ..
            } => {
                let warning = if *persisted { "" } else { " (not saved to disk)" };
                format!(
                    "Round {round}: committed {}{warning}",
                    self.catalog.move_label(*mv)
                )
            }
            TurnEvent::MoveRevealed { round, mv, .. } => {
                format!("Round {round}: revealed {}", self.catalog.move_label(*mv))
            }
            TurnEvent::StateChanged { state, .. } => describe_state(*state).to_string(),
        }
    }

    /// "You" for the local participant, "Opponent 0x…" otherwise.
    pub fn participant_label(&self, participant: Address) -> String {
        match self.me {
            Some(me) if me == participant => "You".to_string(),
            Some(_) => format!("Opponent {}", short_address(participant)),
            None => short_address(participant),
        }
    }
}

pub fn describe_lifecycle(event: &LifecycleEvent) -> String {
    match event {
        LifecycleEvent::ExitStarted { match_id, reason } => {
            format!("Leaving {match_id}: {}", reason.describe())
        }
        LifecycleEvent::Exited { match_id, reason } => {
            format!("Left {match_id}: {}", reason.describe())
        }
        LifecycleEvent::ExitFailed {
            match_id, error, ..
        } => format!("Could not leave {match_id} yet: {error}"),
        LifecycleEvent::Halted { match_id, reason } => {
            format!("Stopped playing {match_id}: {reason}")
        }
    }
}

pub fn describe_state(state: SyncState) -> &'static str {
    match state {
        SyncState::NotInMatch => "Not in a match",
        SyncState::AwaitingOpponent => "Waiting for an opponent to join",
        SyncState::MyTurnPending => "Your move",
        SyncState::WaitingOnOpponentCommit => "Waiting for the opponent to commit",
        SyncState::WaitingOnOpponentReveal => "Waiting for the opponent to reveal",
        SyncState::MatchOver => "Match over",
    }
}

/// Ledger monster ids are instance ids, not types.
pub fn monster_label(monster: u64) -> String {
    format!("Monster #{monster}")
}

/// Multiplier is a percentage; 100 is neutral.
pub fn effectiveness(multiplier: u64) -> Option<&'static str> {
    match multiplier {
        0 => Some("no effect"),
        1..=99 => Some("not very effective"),
        100 => None,
        _ => Some("super effective"),
    }
}

/// `0x1234…abcd`
pub fn short_address(address: Address) -> String {
    let full = format!("{address:#x}");
    if full.len() <= 12 {
        return full;
    }
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
