// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter store trait: append-only archive of permanently failed tasks.

use async_trait::async_trait;

use crate::error::RiposteError;
use crate::types::DeadLetterEntry;

/// Append-only archive for tasks that exhausted their retries.
///
/// Exists for operator visibility and manual intervention; entries are never
/// reprocessed automatically.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Append a dead-letter record.
    async fn save(&self, entry: &DeadLetterEntry) -> Result<(), RiposteError>;

    /// Total number of archived entries.
    async fn count(&self) -> Result<u64, RiposteError>;

    /// The most recent entries, newest first.
    async fn find_recent(&self, limit: u32) -> Result<Vec<DeadLetterEntry>, RiposteError>;
}
