// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only dead-letter archival.

use std::str::FromStr;

use rusqlite::params;

use riposte_core::types::{AccountId, ChatId, DeadLetterEntry, TaskId, TaskKind};
use riposte_core::RiposteError;

use crate::database::{map_tr_err, Database};
use crate::queries::{conversion_err, parse_timestamp};

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<DeadLetterEntry, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let payload: String = row.get(4)?;
    let failed_at: String = row.get(7)?;

    Ok(DeadLetterEntry {
        task_id: TaskId(row.get(0)?),
        account_id: AccountId(row.get(1)?),
        chat_id: ChatId(row.get(2)?),
        kind: TaskKind::from_str(&kind).map_err(|e| conversion_err(3, e))?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(4, e))?,
        error: row.get(5)?,
        retries: row.get(6)?,
        failed_at: parse_timestamp(7, &failed_at)?,
    })
}

/// Append a dead-letter record.
pub async fn save_entry(db: &Database, entry: &DeadLetterEntry) -> Result<(), RiposteError> {
    let payload = serde_json::to_string(&entry.payload).map_err(|e| RiposteError::Storage {
        source: Box::new(e),
    })?;
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO dead_letters (task_id, account_id, chat_id, kind, payload, error,
                     retries, failed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.task_id.0,
                    entry.account_id.0,
                    entry.chat_id.0,
                    entry.kind.to_string(),
                    payload,
                    entry.error,
                    entry.retries,
                    entry.failed_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Total archived entries.
pub async fn count_entries(db: &Database) -> Result<u64, RiposteError> {
    db.connection()
        .call(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM dead_letters", [], |row| {
                row.get(0)
            })?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent entries, newest first.
pub async fn find_recent(db: &Database, limit: u32) -> Result<Vec<DeadLetterEntry>, RiposteError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, account_id, chat_id, kind, payload, error, retries, failed_at
                 FROM dead_letters
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
