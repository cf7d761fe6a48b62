//! Event codec for ledger log records.
//!
//! The ledger appends `(id, discriminant, timestamp, payload)` records to a
//! per-match log. [`decode`] maps a record to a [`DecodedEvent`] using the
//! closed [`REGISTRY`]. Unknown discriminants decode to `None` so older clients
//! keep working when the ledger introduces new event types.
//!
//! Decoding is pure: no I/O, no clock, no global state.
mod kind;
mod registry;

use serde::{Deserialize, Serialize};

pub use kind::EventKind;
pub use registry::{
    FieldKind, FieldValue, PROTOCOL_DOMAIN_THRESHOLD, REGISTRY, REGISTRY_VERSION,
    VariantDescriptor, encode_words, lookup,
};

use crate::error::DecodeError;

/// Which side of the threshold a discriminant falls on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Rule-engine output (status effects, damage, heals). Display only.
    Game,
    /// Commit-reveal protocol events the synchronizer reacts to.
    Protocol,
}

impl Domain {
    pub fn of(discriminant: u64) -> Self {
        if discriminant >= PROTOCOL_DOMAIN_THRESHOLD {
            Domain::Protocol
        } else {
            Domain::Game
        }
    }
}

/// A decoded ledger log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Log sequence number; strictly increasing within a match.
    pub id: u64,
    pub timestamp: u64,
    pub kind: EventKind,
}

impl DecodedEvent {
    pub fn discriminant(&self) -> u64 {
        self.kind.discriminant()
    }

    pub fn domain(&self) -> Domain {
        Domain::of(self.discriminant())
    }

    pub fn name(&self) -> &'static str {
        lookup(self.discriminant())
            .map(|d| d.name)
            .unwrap_or("Unknown")
    }
}

/// Decodes a record, surfacing malformed payloads as errors.
///
/// Returns `Ok(None)` for discriminants missing from the registry.
pub fn try_decode(
    id: u64,
    discriminant: u64,
    timestamp: u64,
    raw: &[u8],
) -> Result<Option<DecodedEvent>, DecodeError> {
    let Some(descriptor) = lookup(discriminant) else {
        return Ok(None);
    };
    let kind = descriptor.parse(raw)?;
    Ok(Some(DecodedEvent {
        id,
        timestamp,
        kind,
    }))
}

/// Decodes a record, treating malformed payloads like unknown ones.
pub fn decode(id: u64, discriminant: u64, timestamp: u64, raw: &[u8]) -> Option<DecodedEvent> {
    match try_decode(id, discriminant, timestamp, raw) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(
                target: "battle_core::events",
                id,
                discriminant,
                %error,
                "Dropping malformed event payload"
            );
            None
        }
    }
}

/// Encodes an event into its `(discriminant, payload)` wire form.
pub fn encode(kind: &EventKind) -> (u64, Vec<u8>) {
    (kind.discriminant(), encode_words(&kind.to_fields()))
}
