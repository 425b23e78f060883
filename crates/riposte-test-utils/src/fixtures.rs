// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for common test fixtures.

use std::collections::HashMap;

use chrono::Utc;

use riposte_core::types::{
    AccountId, ActionKind, ActionSpec, ChatId, ChatKind, MatcherKind, MatcherSpec, Message,
    MessageId, QueueTask, Rule, RuleId, StopPolicy, TaskDraft, TaskId, TaskKind, TaskMetadata,
    TaskPayload, TaskStatus,
};

/// An inbound private-chat message with the given text.
pub fn make_message(text: &str) -> Message {
    Message {
        id: MessageId(format!("msg-{}", uuid::Uuid::new_v4())),
        chat_id: ChatId("chat-1".into()),
        sender_id: "sender-1".into(),
        text: text.to_string(),
        chat_kind: ChatKind::Private,
        is_outgoing: false,
        created_at: Utc::now(),
        metadata: HashMap::new(),
    }
}

/// A simple enabled contains-matcher rule with one text action.
pub fn make_rule(id: &str, account: &str, priority: i32, pattern: &str) -> Rule {
    Rule {
        id: RuleId(id.to_string()),
        account_id: AccountId(account.to_string()),
        name: format!("rule {id}"),
        priority,
        salience: 0,
        enabled: true,
        matchers: vec![MatcherSpec {
            kind: MatcherKind::Contains,
            pattern: pattern.to_string(),
            case_sensitive: false,
        }],
        conditions: vec![],
        actions: vec![ActionSpec {
            kind: ActionKind::SendText,
            payload: format!("auto-reply from {id}"),
            delay_ms: None,
            enabled: true,
        }],
        stop_policy: StopPolicy::All,
        max_triggers: None,
        trigger_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A pending text task eligible immediately.
pub fn make_task(id: &str) -> QueueTask {
    let now = Utc::now();
    QueueTask {
        id: TaskId(id.to_string()),
        account_id: AccountId("acct-1".into()),
        chat_id: ChatId("chat-1".into()),
        kind: TaskKind::Text,
        priority: 0,
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

/// A text task draft eligible immediately.
pub fn make_draft(account: &str, chat: &str, text: &str, priority: i32) -> TaskDraft {
    TaskDraft {
        account_id: AccountId(account.to_string()),
        chat_id: ChatId(chat.to_string()),
        kind: TaskKind::Text,
        priority,
        payload: TaskPayload {
            text: Some(text.to_string()),
            ..Default::default()
        },
        metadata: TaskMetadata::default(),
        scheduled_at: None,
        max_retries: None,
    }
}
