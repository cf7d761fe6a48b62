//! Typed event variants.
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use super::registry::FieldValue::{self, Address as Addr, Bool, Bytes32, Uint};
use crate::types::MoveRef;

/// Strongly typed payload of a decoded ledger event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    AddStatusEffect {
        effect: Address,
        monster: u64,
        remaining_turns: u64,
    },
    ApplyMonsterStatusEffect {
        effect: Address,
        monster: u64,
        extra: u64,
    },
    ApplyMoveStatusEffect {
        effect: Address,
        mv: MoveRef,
        is_hit: bool,
    },
    ApplyOtherStatusEffect {
        effect: Address,
        is_hit: bool,
    },
    Damage {
        mv: MoveRef,
        attacker: u64,
        defender: u64,
        damage: u64,
        /// Percentage; 100 means neutral.
        elemental_multiplier: u64,
        is_critical: bool,
    },
    Heal {
        mv: MoveRef,
        monster: u64,
        amount: u64,
    },
    RemoveStatusEffectsByGroup {
        mv: MoveRef,
        monster: u64,
        group: u64,
    },
    CommitMove {
        player: Address,
        commit: B256,
    },
    RevealMove {
        player: Address,
        mv: MoveRef,
    },
    FirstStriker {
        monster: u64,
    },
    GameOver {
        winner: Address,
    },
}

impl EventKind {
    pub fn discriminant(&self) -> u64 {
        match self {
            EventKind::AddStatusEffect { .. } => 1,
            EventKind::ApplyMonsterStatusEffect { .. } => 2,
            EventKind::ApplyMoveStatusEffect { .. } => 3,
            EventKind::ApplyOtherStatusEffect { .. } => 4,
            EventKind::Damage { .. } => 5,
            EventKind::Heal { .. } => 6,
            EventKind::RemoveStatusEffectsByGroup { .. } => 7,
            EventKind::CommitMove { .. } => 1_000_000,
            EventKind::RevealMove { .. } => 1_000_001,
            EventKind::FirstStriker { .. } => 1_000_002,
            EventKind::GameOver { .. } => 1_000_003,
        }
    }

    /// Monster the event is about, if any.
    pub fn monster(&self) -> Option<u64> {
        match self {
            EventKind::AddStatusEffect { monster, .. }
            | EventKind::ApplyMonsterStatusEffect { monster, .. }
            | EventKind::Heal { monster, .. }
            | EventKind::RemoveStatusEffectsByGroup { monster, .. }
            | EventKind::FirstStriker { monster } => Some(*monster),
            EventKind::Damage { defender, .. } => Some(*defender),
            _ => None,
        }
    }

    /// Payload words in registry order.
    pub(crate) fn to_fields(&self) -> Vec<FieldValue> {
        match *self {
            EventKind::AddStatusEffect {
                effect,
                monster,
                remaining_turns,
            } => vec![Addr(effect), Uint(monster), Uint(remaining_turns)],
            EventKind::ApplyMonsterStatusEffect {
                effect,
                monster,
                extra,
            } => vec![Addr(effect), Uint(monster), Uint(extra)],
            EventKind::ApplyMoveStatusEffect { effect, mv, is_hit } => {
                vec![Addr(effect), Addr(mv.0), Bool(is_hit)]
            }
            EventKind::ApplyOtherStatusEffect { effect, is_hit } => {
                vec![Addr(effect), Bool(is_hit)]
            }
            EventKind::Damage {
                mv,
                attacker,
                defender,
                damage,
                elemental_multiplier,
                is_critical,
            } => vec![
                Addr(mv.0),
                Uint(attacker),
                Uint(defender),
                Uint(damage),
                Uint(elemental_multiplier),
                Bool(is_critical),
            ],
            EventKind::Heal {
                mv,
                monster,
                amount,
            } => vec![Addr(mv.0), Uint(monster), Uint(amount)],
            EventKind::RemoveStatusEffectsByGroup { mv, monster, group } => {
                vec![Addr(mv.0), Uint(monster), Uint(group)]
            }
            EventKind::CommitMove { player, commit } => vec![Addr(player), Bytes32(commit)],
            EventKind::RevealMove { player, mv } => vec![Addr(player), Addr(mv.0)],
            EventKind::FirstStriker { monster } => vec![Uint(monster)],
            EventKind::GameOver { winner } => vec![Addr(winner)],
        }
    }
}

pub(super) fn build_add_status_effect(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(effect), Uint(monster), Uint(remaining_turns)] => Some(EventKind::AddStatusEffect {
            effect,
            monster,
            remaining_turns,
        }),
        _ => None,
    }
}

pub(super) fn build_apply_monster_status_effect(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(effect), Uint(monster), Uint(extra)] => Some(EventKind::ApplyMonsterStatusEffect {
            effect,
            monster,
            extra,
        }),
        _ => None,
    }
}

pub(super) fn build_apply_move_status_effect(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(effect), Addr(mv), Bool(is_hit)] => Some(EventKind::ApplyMoveStatusEffect {
            effect,
            mv: MoveRef(mv),
            is_hit,
        }),
        _ => None,
    }
}

pub(super) fn build_apply_other_status_effect(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(effect), Bool(is_hit)] => Some(EventKind::ApplyOtherStatusEffect { effect, is_hit }),
        _ => None,
    }
}

pub(super) fn build_damage(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [
            Addr(mv),
            Uint(attacker),
            Uint(defender),
            Uint(damage),
            Uint(elemental_multiplier),
            Bool(is_critical),
        ] => Some(EventKind::Damage {
            mv: MoveRef(mv),
            attacker,
            defender,
            damage,
            elemental_multiplier,
            is_critical,
        }),
        _ => None,
    }
}

pub(super) fn build_heal(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(mv), Uint(monster), Uint(amount)] => Some(EventKind::Heal {
            mv: MoveRef(mv),
            monster,
            amount,
        }),
        _ => None,
    }
}

pub(super) fn build_remove_status_effects_by_group(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(mv), Uint(monster), Uint(group)] => Some(EventKind::RemoveStatusEffectsByGroup {
            mv: MoveRef(mv),
            monster,
            group,
        }),
        _ => None,
    }
}

pub(super) fn build_commit_move(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(player), Bytes32(commit)] => Some(EventKind::CommitMove { player, commit }),
        _ => None,
    }
}

pub(super) fn build_reveal_move(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(player), Addr(mv)] => Some(EventKind::RevealMove {
            player,
            mv: MoveRef(mv),
        }),
        _ => None,
    }
}

pub(super) fn build_first_striker(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Uint(monster)] => Some(EventKind::FirstStriker { monster }),
        _ => None,
    }
}

pub(super) fn build_game_over(v: &[FieldValue]) -> Option<EventKind> {
    match *v {
        [Addr(winner)] => Some(EventKind::GameOver { winner }),
        _ => None,
    }
}
