// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outbound dispatcher: glue between the rule engine and the queue.
//!
//! Implements the engine's `ActionSink`: each fired action becomes one queue
//! task, unless the dedup gate has seen an identical action within its TTL,
//! in which case the action is reported as already delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use riposte_config::DedupConfig;
use riposte_core::RiposteError;
use riposte_rules::{ActionSink, FiredAction, SubmitReport};

use crate::builder::build_draft;
use crate::dedup::{dedup_key, DedupGate};
use crate::queue::TaskQueue;

/// Builds, dedups, and enqueues fired rule actions.
pub struct OutboundDispatcher {
    queue: Arc<TaskQueue>,
    dedup: DedupGate,
}

impl OutboundDispatcher {
    pub fn new(queue: Arc<TaskQueue>, config: &DedupConfig) -> Self {
        Self {
            queue,
            dedup: DedupGate::new(Duration::from_secs(config.ttl_secs), config.max_entries),
        }
    }
}

#[async_trait]
impl ActionSink for OutboundDispatcher {
    async fn submit(&self, actions: Vec<FiredAction>) -> Result<SubmitReport, RiposteError> {
        let now = Utc::now();
        let mut report = SubmitReport::default();

        for fired in actions {
            let key = dedup_key(
                &fired.account_id,
                &fired.chat_id,
                &fired.trigger_message_id,
                fired.kind,
                &fired.payload,
            );
            if !self.dedup.check_and_register(key) {
                debug!(
                    rule_id = %fired.rule_id.0,
                    trigger = %fired.trigger_message_id.0,
                    "duplicate action suppressed"
                );
                report.deduplicated += 1;
                continue;
            }

            let draft = build_draft(&fired, now);
            let id = self.queue.enqueue(draft).await?;
            report.enqueued.push(id);
        }

        Ok(report)
    }
}
