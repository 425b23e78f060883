// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Converts fired rule actions into queue task drafts.
//!
//! One draft per action (not one per rule); the action's configured delay
//! shifts the draft's earliest dispatch time, and the originating rule id
//! and trigger message id are carried in the task metadata for dedup and
//! operator audit.

use chrono::{DateTime, Duration, Utc};

use riposte_core::types::{ActionKind, TaskDraft, TaskKind, TaskMetadata, TaskPayload};
use riposte_rules::FiredAction;

/// Build the queue draft for one fired action.
pub fn build_draft(fired: &FiredAction, now: DateTime<Utc>) -> TaskDraft {
    let payload = match fired.kind {
        ActionKind::SendText => TaskPayload {
            text: Some(fired.payload.clone()),
            ..Default::default()
        },
        ActionKind::SendImage => TaskPayload {
            image_path: Some(fired.payload.clone()),
            ..Default::default()
        },
        ActionKind::MarkRead => TaskPayload::default(),
    };

    let scheduled_at = fired
        .delay_ms
        .map(|delay| now + Duration::milliseconds(delay as i64));

    TaskDraft {
        account_id: fired.account_id.clone(),
        chat_id: fired.chat_id.clone(),
        kind: TaskKind::from(fired.kind),
        priority: fired.priority,
        payload,
        metadata: TaskMetadata {
            rule_id: Some(fired.rule_id.clone()),
            trigger_message_id: Some(fired.trigger_message_id.clone()),
        },
        scheduled_at,
        max_retries: None,
    }
}
