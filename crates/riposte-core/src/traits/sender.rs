// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender trait: the collaborator that performs the real outbound side effect.

use async_trait::async_trait;

use crate::error::RiposteError;
use crate::types::{QueueTask, SendReceipt};

/// Executes the side effect a queue task describes (send text, send image,
/// mark a chat read).
///
/// The queue calls `deliver` under a timeout; implementations must be safe to
/// abandon mid-call. A returned error feeds the queue's retry path.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn deliver(&self, task: &QueueTask) -> Result<SendReceipt, RiposteError>;
}
