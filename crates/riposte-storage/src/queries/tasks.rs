// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue task CRUD and status-filtered queries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use riposte_core::types::{
    AccountId, ChatId, QueueTask, TaskId, TaskKind, TaskStatus,
};
use riposte_core::RiposteError;

use crate::database::{map_tr_err, Database};
use crate::queries::{conversion_err, parse_timestamp};

const TASK_COLUMNS: &str = "id, account_id, chat_id, kind, priority, status, payload, metadata,
     retries, max_retries, scheduled_at, processed_at, completed_at, last_error, result, created_at";

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<QueueTask, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let status: String = row.get(5)?;
    let payload: String = row.get(6)?;
    let metadata: String = row.get(7)?;
    let scheduled_at: String = row.get(10)?;
    let processed_at: Option<String> = row.get(11)?;
    let completed_at: Option<String> = row.get(12)?;
    let created_at: String = row.get(15)?;

    Ok(QueueTask {
        id: TaskId(row.get(0)?),
        account_id: AccountId(row.get(1)?),
        chat_id: ChatId(row.get(2)?),
        kind: TaskKind::from_str(&kind).map_err(|e| conversion_err(3, e))?,
        priority: row.get(4)?,
        status: TaskStatus::from_str(&status).map_err(|e| conversion_err(5, e))?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(6, e))?,
        metadata: serde_json::from_str(&metadata).map_err(|e| conversion_err(7, e))?,
        retries: row.get(8)?,
        max_retries: row.get(9)?,
        scheduled_at: parse_timestamp(10, &scheduled_at)?,
        processed_at: processed_at
            .map(|v| parse_timestamp(11, &v))
            .transpose()?,
        completed_at: completed_at
            .map(|v| parse_timestamp(12, &v))
            .transpose()?,
        last_error: row.get(13)?,
        result: row.get(14)?,
        created_at: parse_timestamp(15, &created_at)?,
    })
}

fn encode(task: &QueueTask) -> Result<(String, String), RiposteError> {
    let payload = serde_json::to_string(&task.payload).map_err(|e| RiposteError::Storage {
        source: Box::new(e),
    })?;
    let metadata = serde_json::to_string(&task.metadata).map_err(|e| RiposteError::Storage {
        source: Box::new(e),
    })?;
    Ok((payload, metadata))
}

/// Insert a new task row.
pub async fn insert_task(db: &Database, task: &QueueTask) -> Result<(), RiposteError> {
    let (payload, metadata) = encode(task)?;
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, account_id, chat_id, kind, priority, status, payload,
                     metadata, retries, max_retries, scheduled_at, processed_at, completed_at,
                     last_error, result, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    task.id.0,
                    task.account_id.0,
                    task.chat_id.0,
                    task.kind.to_string(),
                    task.priority,
                    task.status.to_string(),
                    payload,
                    metadata,
                    task.retries,
                    task.max_retries,
                    task.scheduled_at.to_rfc3339(),
                    task.processed_at.map(|t| t.to_rfc3339()),
                    task.completed_at.map(|t| t.to_rfc3339()),
                    task.last_error,
                    task.result,
                    task.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a task by id.
pub async fn get_task(db: &Database, id: &TaskId) -> Result<Option<QueueTask>, RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_task)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Write back a task's full state.
pub async fn update_task(db: &Database, task: &QueueTask) -> Result<(), RiposteError> {
    let (payload, metadata) = encode(task)?;
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?2, payload = ?3, metadata = ?4, retries = ?5,
                     priority = ?6, scheduled_at = ?7, processed_at = ?8, completed_at = ?9,
                     last_error = ?10, result = ?11
                 WHERE id = ?1",
                params![
                    task.id.0,
                    task.status.to_string(),
                    payload,
                    metadata,
                    task.retries,
                    task.priority,
                    task.scheduled_at.to_rfc3339(),
                    task.processed_at.map(|t| t.to_rfc3339()),
                    task.completed_at.map(|t| t.to_rfc3339()),
                    task.last_error,
                    task.result,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All pending tasks due at or before `now`.
pub async fn find_pending(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<QueueTask>, RiposteError> {
    let now = now.to_rfc3339();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE status = 'pending' AND scheduled_at <= ?1
                 ORDER BY priority DESC, scheduled_at ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_task)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(map_tr_err)
}

/// All tasks in the given status.
pub async fn find_by_status(
    db: &Database,
    status: TaskStatus,
) -> Result<Vec<QueueTask>, RiposteError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE status = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_task)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(map_tr_err)
}

/// Count tasks in the given status.
pub async fn count_by_status(db: &Database, status: TaskStatus) -> Result<u64, RiposteError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a task row. Returns `true` if a row was removed.
pub async fn delete_task(db: &Database, id: &TaskId) -> Result<bool, RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Prune completed tasks finished before `cutoff`. Returns rows removed.
pub async fn delete_old_completed(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, RiposteError> {
    let cutoff = cutoff.to_rfc3339();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM tasks
                 WHERE status = 'completed' AND completed_at IS NOT NULL AND completed_at < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riposte_config::StorageConfig;
    use riposte_core::types::{TaskMetadata, TaskPayload};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tasks.db");
        let config = StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();
        (db, dir)
    }

    fn make_task(id: &str, priority: i32) -> QueueTask {
        let now = Utc::now();
        QueueTask {
            id: TaskId(id.to_string()),
            account_id: AccountId("a1".into()),
            chat_id: ChatId("c1".into()),
            kind: TaskKind::Text,
            priority,
            status: TaskStatus::Pending,
            payload: TaskPayload {
                text: Some("hello".into()),
                ..Default::default()
            },
            metadata: TaskMetadata::default(),
            retries: 0,
            max_retries: 3,
            scheduled_at: now,
            processed_at: None,
            completed_at: None,
            last_error: None,
            result: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_all_fields() {
        let (db, _dir) = setup_db().await;

        let mut task = make_task("t1", 9);
        task.metadata.rule_id = Some(riposte_core::types::RuleId("r1".into()));
        task.last_error = Some("previous error".into());
        insert_task(&db, &task).await.unwrap();

        let loaded = get_task(&db, &task.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.kind, TaskKind::Text);
        assert_eq!(loaded.priority, 9);
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert_eq!(loaded.payload, task.payload);
        assert_eq!(loaded.metadata.rule_id.as_ref().unwrap().0, "r1");
        assert_eq!(loaded.last_error.as_deref(), Some("previous error"));
        assert_eq!(loaded.scheduled_at, task.scheduled_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_pending_orders_and_filters() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let mut low = make_task("low", 100);
        low.scheduled_at = now - chrono::Duration::seconds(10);
        let high = make_task("high", 500);
        let mut future = make_task("future", 900);
        future.scheduled_at = now + chrono::Duration::seconds(120);

        insert_task(&db, &low).await.unwrap();
        insert_task(&db, &high).await.unwrap();
        insert_task(&db, &future).await.unwrap();

        let pending = find_pending(&db, now).await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|t| t.id.0.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_persists_status_transition() {
        let (db, _dir) = setup_db().await;

        let mut task = make_task("t1", 0);
        insert_task(&db, &task).await.unwrap();

        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        task.result = Some("remote-123".into());
        update_task(&db, &task).await.unwrap();

        let loaded = get_task(&db, &task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Completed);
        assert_eq!(loaded.result.as_deref(), Some("remote-123"));
        assert!(loaded.completed_at.is_some());

        assert_eq!(count_by_status(&db, TaskStatus::Completed).await.unwrap(), 1);
        assert_eq!(count_by_status(&db, TaskStatus::Pending).await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_task_reports_removal() {
        let (db, _dir) = setup_db().await;
        let task = make_task("t1", 0);
        insert_task(&db, &task).await.unwrap();

        assert!(delete_task(&db, &task.id).await.unwrap());
        assert!(!delete_task(&db, &task.id).await.unwrap());
        assert!(get_task(&db, &task.id).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_old_completed_prunes_only_old_rows() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let mut old = make_task("old", 0);
        old.status = TaskStatus::Completed;
        old.completed_at = Some(now - chrono::Duration::days(2));
        let mut fresh = make_task("fresh", 0);
        fresh.status = TaskStatus::Completed;
        fresh.completed_at = Some(now);
        let pending = make_task("pending", 0);

        insert_task(&db, &old).await.unwrap();
        insert_task(&db, &fresh).await.unwrap();
        insert_task(&db, &pending).await.unwrap();

        let removed = delete_old_completed(&db, now - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(get_task(&db, &old.id).await.unwrap().is_none());
        assert!(get_task(&db, &fresh.id).await.unwrap().is_some());
        assert!(get_task(&db, &pending.id).await.unwrap().is_some());

        db.close().await.unwrap();
    }
}
