//! Closed, versioned registry of event layouts.
//!
//! Every payload is an ABI-encoded static tuple: one 32 byte word per field,
//! in declaration order.
use alloy_primitives::{Address, B256};

use super::kind::{self, EventKind};
use crate::error::DecodeError;

/// Bumped whenever a descriptor is added or a layout changes.
pub const REGISTRY_VERSION: u32 = 1;

/// Discriminants at or above this value belong to the protocol domain.
pub const PROTOCOL_DOMAIN_THRESHOLD: u64 = 1_000_000;

const WORD: usize = 32;

/// Solidity type of a single payload word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum FieldKind {
    Address,
    Uint,
    Bool,
    Bytes32,
}

/// A parsed payload word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    Uint(u64),
    Bool(bool),
    Bytes32(B256),
}

/// Layout and constructor for one event variant.
pub struct VariantDescriptor {
    pub discriminant: u64,
    pub name: &'static str,
    pub fields: &'static [FieldKind],
    build: fn(&[FieldValue]) -> Option<EventKind>,
}

impl VariantDescriptor {
    /// Number of payload bytes the layout occupies.
    pub fn payload_len(&self) -> usize {
        self.fields.len() * WORD
    }

    /// Parses `raw` against this layout.
    ///
    /// Trailing bytes beyond the declared layout are ignored so newer ledgers
    /// can append fields without breaking older clients.
    pub fn parse(&self, raw: &[u8]) -> Result<EventKind, DecodeError> {
        let expected = self.payload_len();
        if raw.len() < expected {
            return Err(DecodeError::Truncated {
                variant: self.name,
                expected,
                actual: raw.len(),
            });
        }

        let values = self
            .fields
            .iter()
            .zip(raw.chunks_exact(WORD))
            .enumerate()
            .map(|(index, (kind, word))| self.parse_word(index, *kind, word))
            .collect::<Result<Vec<_>, _>>()?;

        (self.build)(&values).ok_or(DecodeError::LayoutMismatch { variant: self.name })
    }

    fn parse_word(
        &self,
        index: usize,
        kind: FieldKind,
        word: &[u8],
    ) -> Result<FieldValue, DecodeError> {
        let variant = self.name;
        match kind {
            FieldKind::Address => {
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(DecodeError::InvalidAddress { variant, index });
                }
                Ok(FieldValue::Address(Address::from_slice(&word[12..])))
            }
            FieldKind::Uint => {
                if word[..24].iter().any(|b| *b != 0) {
                    return Err(DecodeError::UintOverflow { variant, index });
                }
                let mut low = [0u8; 8];
                low.copy_from_slice(&word[24..]);
                Ok(FieldValue::Uint(u64::from_be_bytes(low)))
            }
            FieldKind::Bool => match (word[..31].iter().all(|b| *b == 0), word[31]) {
                (true, 0) => Ok(FieldValue::Bool(false)),
                (true, 1) => Ok(FieldValue::Bool(true)),
                _ => Err(DecodeError::InvalidBool { variant, index }),
            },
            FieldKind::Bytes32 => Ok(FieldValue::Bytes32(B256::from_slice(word))),
        }
    }
}

/// Encodes field values as consecutive ABI words.
pub fn encode_words(values: &[FieldValue]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * WORD);
    for value in values {
        let mut word = [0u8; WORD];
        match value {
            FieldValue::Address(address) => word[12..].copy_from_slice(address.as_slice()),
            FieldValue::Uint(n) => word[24..].copy_from_slice(&n.to_be_bytes()),
            FieldValue::Bool(flag) => word[31] = u8::from(*flag),
            FieldValue::Bytes32(bytes) => word.copy_from_slice(bytes.as_slice()),
        }
        out.extend_from_slice(&word);
    }
    out
}

use FieldKind::{Address as A, Bool as B, Bytes32 as H, Uint as U};

/// Registered variants, sorted by discriminant.
pub static REGISTRY: &[VariantDescriptor] = &[
    VariantDescriptor {
        discriminant: 1,
        name: "AddStatusEffect",
        fields: &[A, U, U],
        build: kind::build_add_status_effect,
    },
    VariantDescriptor {
        discriminant: 2,
        name: "ApplyMonsterStatusEffect",
        fields: &[A, U, U],
        build: kind::build_apply_monster_status_effect,
    },
    VariantDescriptor {
        discriminant: 3,
        name: "ApplyMoveStatusEffect",
        fields: &[A, A, B],
        build: kind::build_apply_move_status_effect,
    },
    VariantDescriptor {
        discriminant: 4,
        name: "ApplyOtherStatusEffect",
        fields: &[A, B],
        build: kind::build_apply_other_status_effect,
    },
    VariantDescriptor {
        discriminant: 5,
        name: "Damage",
        fields: &[A, U, U, U, U, B],
        build: kind::build_damage,
    },
    VariantDescriptor {
        discriminant: 6,
        name: "Heal",
        fields: &[A, U, U],
        build: kind::build_heal,
    },
    VariantDescriptor {
        discriminant: 7,
        name: "RemoveStatusEffectsByGroup",
        fields: &[A, U, U],
        build: kind::build_remove_status_effects_by_group,
    },
    VariantDescriptor {
        discriminant: 1_000_000,
        name: "CommitMove",
        fields: &[A, H],
        build: kind::build_commit_move,
    },
    VariantDescriptor {
        discriminant: 1_000_001,
        name: "RevealMove",
        fields: &[A, A],
        build: kind::build_reveal_move,
    },
    VariantDescriptor {
        discriminant: 1_000_002,
        name: "FirstStriker",
        fields: &[U],
        build: kind::build_first_striker,
    },
    VariantDescriptor {
        discriminant: 1_000_003,
        name: "GameOver",
        fields: &[A],
        build: kind::build_game_over,
    },
];

/// Finds the descriptor registered for `discriminant`.
pub fn lookup(discriminant: u64) -> Option<&'static VariantDescriptor> {
    REGISTRY
        .binary_search_by_key(&discriminant, |d| d.discriminant)
        .ok()
        .map(|index| &REGISTRY[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_sorted_and_unique() {
        assert!(
            REGISTRY
                .windows(2)
                .all(|pair| pair[0].discriminant < pair[1].discriminant),
            "lookup relies on binary search"
        );
    }

    #[test]
    fn protocol_variants_sit_above_threshold() {
        for descriptor in REGISTRY {
            let protocol = matches!(
                descriptor.name,
                "CommitMove" | "RevealMove" | "FirstStriker" | "GameOver"
            );
            assert_eq!(
                descriptor.discriminant >= PROTOCOL_DOMAIN_THRESHOLD,
                protocol,
                "{} is in the wrong domain",
                descriptor.name
            );
        }
    }

    #[test]
    fn bool_word_rejects_dirty_high_bytes() {
        let descriptor = lookup(4).expect("registered");
        let mut raw = encode_words(&[
            FieldValue::Address(Address::repeat_byte(1)),
            FieldValue::Bool(true),
        ]);
        raw[40] = 0xff;
        assert_eq!(
            descriptor.parse(&raw),
            Err(DecodeError::InvalidBool {
                variant: "ApplyOtherStatusEffect",
                index: 1
            })
        );
    }
}
