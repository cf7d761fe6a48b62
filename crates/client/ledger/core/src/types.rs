//! Data carried across the ledger boundary.
use battle_core::{Address, B256, DecodedEvent, GameMode, MatchId};
use serde::{Deserialize, Serialize};

/// Records per event-log page. A shorter page marks the end of the log.
pub const EVENT_PAGE_SIZE: usize = 100;

/// Receipt of an accepted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Raw, undecoded event-log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogRecord {
    pub id: u64,
    pub discriminant: u64,
    pub timestamp: u64,
    pub data: Vec<u8>,
}

impl RawLogRecord {
    pub fn decode(&self) -> Option<DecodedEvent> {
        battle_core::decode(self.id, self.discriminant, self.timestamp, &self.data)
    }
}

/// One decoded page of a match's event log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Decoded events; unknown or malformed records are omitted.
    pub events: Vec<DecodedEvent>,
    /// Number of raw records the page held, decodable or not.
    pub raw_len: usize,
    /// Offset of the record after this page.
    pub next_offset: u64,
}

impl EventPage {
    pub fn from_records(offset: u64, records: &[RawLogRecord]) -> Self {
        Self {
            events: records.iter().filter_map(RawLogRecord::decode).collect(),
            raw_len: records.len(),
            next_offset: offset + records.len() as u64,
        }
    }

    /// A short page signals end-of-data.
    pub fn is_last(&self) -> bool {
        self.raw_len < EVENT_PAGE_SIZE
    }
}

/// State of a direct challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A direct challenge between two named participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: MatchId,
    pub mode: GameMode,
    pub challenger: Address,
    pub opponent: Address,
    pub status: ChallengeStatus,
}

impl Challenge {
    pub fn is_pending(&self) -> bool {
        self.status == ChallengeStatus::Pending
    }

    /// Pending challenge addressed to `participant`.
    pub fn is_incoming_for(&self, participant: Address) -> bool {
        self.is_pending() && self.opponent == participant
    }

    /// Pending challenge issued by `participant`.
    pub fn is_outgoing_for(&self, participant: Address) -> bool {
        self.is_pending() && self.challenger == participant
    }
}

/// Static facts about a gateway connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerInfo {
    /// Backend name, e.g. `"evm"` or `"mock"`.
    pub backend: &'static str,
    /// Network label or RPC endpoint.
    pub network: String,
    /// Identity transactions are sent from.
    pub participant: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> RawLogRecord {
        RawLogRecord {
            id,
            discriminant: 1_000_002,
            timestamp: 0,
            data: {
                let mut word = vec![0u8; 32];
                word[31] = id as u8;
                word
            },
        }
    }

    #[test]
    fn full_page_is_not_last() {
        let records: Vec<_> = (0..EVENT_PAGE_SIZE as u64).map(record).collect();
        let page = EventPage::from_records(200, &records);
        assert!(!page.is_last());
        assert_eq!(page.next_offset, 300);
        assert_eq!(page.events.len(), EVENT_PAGE_SIZE);
    }

    #[test]
    fn undecodable_records_still_advance_offset() {
        let mut records = vec![record(1), record(2)];
        records[1].discriminant = 42_424_242;
        let page = EventPage::from_records(0, &records);
        assert!(page.is_last());
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.raw_len, 2);
        assert_eq!(page.next_offset, 2);
    }
}
