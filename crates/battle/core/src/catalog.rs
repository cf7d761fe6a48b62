//! Move catalog and display names.
//!
//! Moves, status effects and monsters are identified on the ledger by
//! addresses and numeric ids. The catalog maps them to readable names and
//! provides the candidate list for move selection.
use std::collections::BTreeMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::types::MoveRef;

/// Move contracts deployed alongside the match engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(EnumIter, strum::Display, strum::EnumString, strum::AsRefStr)]
pub enum MoveKind {
    ControlMove,
    DamageOverTimeMove,
    PurgeBuffsMove,
    WallBreakerMove,
    CleansingShieldMove,
    CloudCoverMove,
    ElementalWallMove,
    TailwindMove,
    AttackAuraMove,
    DefenseAuraMove,
    HealMove,
    SpeedAuraMove,
}

impl MoveKind {
    /// Damage-dealing moves; the rest shield or boost.
    pub fn is_offensive(self) -> bool {
        matches!(
            self,
            MoveKind::ControlMove
                | MoveKind::DamageOverTimeMove
                | MoveKind::PurgeBuffsMove
                | MoveKind::WallBreakerMove
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            MoveKind::ControlMove => "Damage: Control",
            MoveKind::DamageOverTimeMove => "Damage: Damage Over Time",
            MoveKind::PurgeBuffsMove => "Damage: Purge Buffs Attack",
            MoveKind::WallBreakerMove => "Damage: Wall Breaker Attack",
            MoveKind::CleansingShieldMove => "Shield: Cleansing Shield",
            MoveKind::CloudCoverMove => "Shield: Cloud Cover",
            MoveKind::ElementalWallMove => "Shield: Elemental Wall",
            MoveKind::TailwindMove => "Shield: Tailwind",
            MoveKind::AttackAuraMove => "Boost: Attack Aura",
            MoveKind::DefenseAuraMove => "Boost: Defense Aura",
            MoveKind::HealMove => "Boost: Heal",
            MoveKind::SpeedAuraMove => "Boost: Speed Aura",
        }
    }
}

/// Monster element as reported by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum Element {
    None,
    Electric,
    Fire,
    Water,
    Mental,
    Nature,
    Toxic,
}

impl Element {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Element::None,
            1 => Element::Electric,
            2 => Element::Fire,
            3 => Element::Water,
            4 => Element::Mental,
            5 => Element::Nature,
            6 => Element::Toxic,
            _ => return None,
        })
    }
}

const MONSTERS: [&str; 12] = [
    "Blazehorn (Fire Bull)",
    "Foretusk (Nature Bull)",
    "Aquasteer (Water Bull)",
    "Flampanda (Fire Bear)",
    "Verdubear (Nature Bear)",
    "Wavepaw (Water Bear)",
    "Pyrilla (Fire Gorilla)",
    "Florangutan (Nature Gorilla)",
    "Tidalmonk (Water Gorilla)",
    "Fernopig (Fire Boar)",
    "Leafsnout (Nature Boar)",
    "Streamhog (Water Boar)",
];

/// Display name of a monster type (1-based, as on the ledger).
pub fn monster_name(monster_type: u64) -> Option<&'static str> {
    let index = usize::try_from(monster_type).ok()?.checked_sub(1)?;
    MONSTERS.get(index).copied()
}

/// Number of monster types a random team can draw from.
pub const MONSTER_TYPES: u64 = MONSTERS.len() as u64;

/// Addresses of deployed moves and status effects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCatalog {
    #[serde(default, deserialize_with = "deserialize_moves")]
    pub moves: BTreeMap<MoveKind, Address>,
    /// Effect display name keyed by name, e.g. `"Debuff: Fogged"`.
    #[serde(default)]
    pub effects: BTreeMap<String, Address>,
}

/// Reads move names as plain strings so unknown names are skipped, not fatal.
fn deserialize_moves<'de, D>(deserializer: D) -> Result<BTreeMap<MoveKind, Address>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, Address>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, address)| match name.parse::<MoveKind>() {
            Ok(kind) => Some((kind, address)),
            Err(_) => {
                tracing::warn!(target: "battle_core::catalog", move_name = %name, "Skipping unknown move");
                None
            }
        })
        .collect())
}

impl MoveCatalog {
    /// Catalog with deterministic placeholder addresses, one per move.
    ///
    /// Used by the in-memory ledger and the offline simulation.
    pub fn synthetic() -> Self {
        let moves = MoveKind::iter()
            .enumerate()
            .map(|(i, kind)| (kind, Address::with_last_byte(0x10 + i as u8)))
            .collect();
        Self {
            moves,
            effects: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn move_ref(&self, kind: MoveKind) -> Option<MoveRef> {
        self.moves.get(&kind).copied().map(MoveRef)
    }

    pub fn kind_of(&self, mv: MoveRef) -> Option<MoveKind> {
        self.moves
            .iter()
            .find_map(|(kind, address)| (*address == mv.address()).then_some(*kind))
    }

    /// Candidate moves in catalog order.
    pub fn choices(&self, offense_only: bool) -> Vec<(MoveKind, MoveRef)> {
        self.moves
            .iter()
            .filter(|(kind, _)| !offense_only || kind.is_offensive())
            .map(|(kind, address)| (*kind, MoveRef(*address)))
            .collect()
    }

    /// Readable name for a move, falling back to its address.
    pub fn move_label(&self, mv: MoveRef) -> String {
        self.kind_of(mv)
            .map(|kind| kind.label().to_string())
            .unwrap_or_else(|| mv.to_string())
    }

    /// Readable name for a status effect, falling back to its address.
    pub fn effect_label(&self, effect: Address) -> String {
        self.effects
            .iter()
            .find_map(|(name, address)| (*address == effect).then(|| name.clone()))
            .unwrap_or_else(|| effect.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offense_only_keeps_damage_moves() {
        let catalog = MoveCatalog::synthetic();
        let kinds: Vec<_> = catalog.choices(true).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                MoveKind::ControlMove,
                MoveKind::DamageOverTimeMove,
                MoveKind::PurgeBuffsMove,
                MoveKind::WallBreakerMove,
            ]
        );
        assert_eq!(catalog.choices(false).len(), 12);
    }

    #[test]
    fn labels_fall_back_to_addresses() {
        let catalog = MoveCatalog::synthetic();
        let heal = catalog.move_ref(MoveKind::HealMove).expect("synthetic move");
        assert_eq!(catalog.move_label(heal), "Boost: Heal");

        let unknown = MoveRef(Address::repeat_byte(0xee));
        assert_eq!(catalog.move_label(unknown), unknown.to_string());
    }

    #[test]
    fn catalog_loads_from_toml() {
        let text = r#"
            [moves]
            ControlMove = "0x00000000000000000000000000000000000000c1"

            [effects]
            "Debuff: Fogged" = "0x00000000000000000000000000000000000000e1"
        "#;
        let catalog: MoveCatalog = toml::from_str(text).expect("valid catalog");
        let control = catalog.move_ref(MoveKind::ControlMove).expect("listed");
        assert_eq!(catalog.kind_of(control), Some(MoveKind::ControlMove));
        assert_eq!(
            catalog.effect_label(Address::with_last_byte(0xe1)),
            "Debuff: Fogged"
        );
    }

    #[test]
    fn monster_names_are_one_based() {
        assert_eq!(monster_name(1), Some("Blazehorn (Fire Bull)"));
        assert_eq!(monster_name(12), Some("Streamhog (Water Boar)"));
        assert_eq!(monster_name(0), None);
        assert_eq!(monster_name(13), None);
    }
}
