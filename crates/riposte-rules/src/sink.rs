// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action sink: the seam between the rule engine and the outbound queue.
//!
//! The engine hands fired actions to an [`ActionSink`]; the queue crate
//! provides the production implementation (build task, dedup, enqueue).

use async_trait::async_trait;

use riposte_core::types::{AccountId, ActionKind, ChatId, MessageId, RuleId, TaskId};
use riposte_core::RiposteError;

/// One enabled action of a rule that fully matched a message, with its
/// payload already rendered.
#[derive(Debug, Clone)]
pub struct FiredAction {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub account_id: AccountId,
    pub chat_id: ChatId,
    /// The inbound message that triggered the rule.
    pub trigger_message_id: MessageId,
    pub kind: ActionKind,
    /// Rendered payload (template placeholders already substituted).
    pub payload: String,
    /// Per-action dispatch delay.
    pub delay_ms: Option<u64>,
    /// Queue priority, inherited from the rule.
    pub priority: i32,
}

/// Outcome of submitting a batch of fired actions.
#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    /// Tasks actually enqueued.
    pub enqueued: Vec<TaskId>,
    /// Actions suppressed by the dedup gate (reported as already delivered).
    pub deduplicated: usize,
}

impl SubmitReport {
    /// Total actions accounted for (enqueued or suppressed as duplicates).
    pub fn triggered(&self) -> usize {
        self.enqueued.len() + self.deduplicated
    }
}

/// Receives fired actions from the rule engine.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn submit(&self, actions: Vec<FiredAction>) -> Result<SubmitReport, RiposteError>;
}
