//! Read-only inspection of a match.
use std::io::Write;

use anyhow::{Context, Result};
use battle_core::events::try_decode;
use battle_core::{MatchId, MoveCatalog};
use client_frontend_core::format::Describer;
use client_ledger_core::{EVENT_PAGE_SIZE, LedgerGateway, RawLogRecord};

/// Writes the match record as pretty JSON.
pub async fn write_match(
    gateway: &dyn LedgerGateway,
    match_id: MatchId,
    out: &mut impl Write,
) -> Result<()> {
    let record = gateway
        .get_match(match_id)
        .await
        .with_context(|| format!("fetching {match_id}"))?;
    serde_json::to_writer_pretty(&mut *out, &record)?;
    writeln!(out)?;
    Ok(())
}

/// Writes one line per log record, paging through the whole log.
///
/// Records that do not decode are printed with their raw payload. Returns
/// the number of records written.
pub async fn write_log(
    gateway: &dyn LedgerGateway,
    catalog: &MoveCatalog,
    match_id: MatchId,
    out: &mut impl Write,
) -> Result<usize> {
    let describer = Describer::new(catalog, None);
    let mut offset = 0u64;
    let mut written = 0;

    loop {
        let page = gateway
            .fetch_log_page(match_id, offset)
            .await
            .with_context(|| format!("reading log of {match_id} at offset {offset}"))?;
        for record in &page {
            writeln!(out, "{}", describe_record(&describer, record))?;
        }
        written += page.len();
        offset += page.len() as u64;
        if page.len() < EVENT_PAGE_SIZE {
            break;
        }
    }
    Ok(written)
}

fn describe_record(describer: &Describer<'_>, record: &RawLogRecord) -> String {
    let prefix = format!("#{:<4} t={}", record.id, record.timestamp);
    match try_decode(record.id, record.discriminant, record.timestamp, &record.data) {
        Ok(Some(event)) => format!(
            "{prefix} {:<26} {}",
            event.name(),
            describer.describe_ledger(&event)
        ),
        Ok(None) => format!(
            "{prefix} unknown discriminant {} 0x{}",
            record.discriminant,
            hex::encode(&record.data)
        ),
        Err(error) => format!(
            "{prefix} malformed ({error}) 0x{}",
            hex::encode(&record.data)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{Address, EventKind, GameMode, Team};
    use client_ledger_core::{MatchQueries, Matchmaking, MockLedger};

    const ALICE: Address = Address::repeat_byte(0xaa);
    const BOB: Address = Address::repeat_byte(0xbb);

    async fn paired(ledger: &MockLedger) -> MatchId {
        for who in [ALICE, BOB] {
            ledger
                .client(who)
                .join_queue(GameMode(2), Team::new(1, 2))
                .await
                .unwrap();
        }
        ledger
            .client(ALICE)
            .get_match_by_participant(ALICE)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn log_dump_keeps_undecodable_records() {
        let ledger = MockLedger::new();
        let match_id = paired(&ledger).await;
        ledger.push_event(match_id, EventKind::FirstStriker { monster: 3 });
        ledger.push_raw(match_id, 9_999, vec![0xde, 0xad]);
        let game_over = EventKind::GameOver { winner: ALICE }.discriminant();
        ledger.push_raw(match_id, game_over, vec![0x01]);

        let mut out = Vec::new();
        let client = ledger.client(ALICE);
        let written = write_log(&client, &MoveCatalog::synthetic(), match_id, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(written, 3);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Monster #3 strikes first"));
        assert!(lines[1].ends_with("unknown discriminant 9999 0xdead"));
        assert!(lines[2].contains("malformed"));
        assert!(lines[2].ends_with("0x01"));
    }

    #[tokio::test]
    async fn log_dump_pages_past_the_first_page() {
        let ledger = MockLedger::new();
        let match_id = paired(&ledger).await;
        for monster in 0..(EVENT_PAGE_SIZE as u64 + 5) {
            ledger.push_event(match_id, EventKind::FirstStriker { monster });
        }

        let mut out = Vec::new();
        let written = write_log(
            &ledger.client(ALICE),
            &MoveCatalog::synthetic(),
            match_id,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(written, EVENT_PAGE_SIZE + 5);
    }

    #[tokio::test]
    async fn match_dump_is_json() {
        let ledger = MockLedger::new();
        let match_id = paired(&ledger).await;

        let mut out = Vec::new();
        write_match(&ledger.client(BOB), match_id, &mut out)
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["round"], 0);
    }
}
