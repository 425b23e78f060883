// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task store trait: the durability boundary for queue tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RiposteError;
use crate::types::{QueueTask, TaskId, TaskStatus};

/// Durable storage for queue tasks.
///
/// The queue treats this as its durability boundary: every lifecycle
/// transition is written through before the queue acts on it.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task.
    async fn insert(&self, task: &QueueTask) -> Result<(), RiposteError>;

    /// Fetch a task by id.
    async fn get(&self, id: &TaskId) -> Result<Option<QueueTask>, RiposteError>;

    /// Write back a task's current state (status, retries, timestamps, error).
    async fn update(&self, task: &QueueTask) -> Result<(), RiposteError>;

    /// All `pending` tasks whose `scheduled_at` is at or before `now`.
    async fn find_pending(&self, now: DateTime<Utc>) -> Result<Vec<QueueTask>, RiposteError>;

    /// All tasks in the given status.
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<QueueTask>, RiposteError>;

    /// Count of tasks in the given status.
    async fn count_by_status(&self, status: TaskStatus) -> Result<u64, RiposteError>;

    /// Delete a task row. Returns `true` if a row was removed.
    async fn delete(&self, id: &TaskId) -> Result<bool, RiposteError>;

    /// Remove completed tasks finished before `cutoff`. Returns rows removed.
    async fn delete_old_completed(&self, cutoff: DateTime<Utc>) -> Result<u64, RiposteError>;
}
