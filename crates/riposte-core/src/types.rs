// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Riposte pipeline.
//!
//! These are the data shapes that cross collaborator trait boundaries:
//! inbound messages, rule definitions, queue tasks, and dead-letter records.
//! Derived/compiled forms (compiled matchers, scope windows) live in the
//! crates that own them.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a chat account operated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// Unique identifier for a chat (conversation) within an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Unique identifier for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Unique identifier for a queue task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

/// Whether a chat is a one-on-one conversation or a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

/// An inbound chat message, as delivered by the message source.
///
/// Messages are immutable inputs: the pipeline never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: String,
    pub text: String,
    pub chat_kind: ChatKind,
    /// True if this account sent the message itself.
    pub is_outgoing: bool,
    pub created_at: DateTime<Utc>,
    /// Free-form metadata from the message source (sender display name, etc.).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// --- Rule definition ---

/// How a matcher compares its pattern against message text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Exact,
    Contains,
    Prefix,
    Suffix,
    Regex,
}

/// A single text matcher within a rule.
///
/// A rule matches textually if *any* of its matchers match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherSpec {
    pub kind: MatcherKind,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// A gating condition on a rule. A rule is eligible only if *all* of its
/// conditions hold for the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    /// Only fire between `start` and `end` (UTC wall time). Windows that wrap
    /// midnight (start > end) are legal. An optional weekday filter further
    /// restricts the window.
    TimeWindow {
        start: NaiveTime,
        end: NaiveTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weekdays: Option<Vec<Weekday>>,
    },
    /// Only fire for the given chat kind.
    ChatKind { kind: ChatKind },
    /// Only fire for senders in the list.
    SenderAllow { senders: Vec<String> },
    /// Never fire for senders in the list.
    SenderDeny { senders: Vec<String> },
    /// Only fire when the message text length (in characters) is within bounds.
    TextLength {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
}

/// What a fired rule action does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendText,
    SendImage,
    MarkRead,
}

/// One outbound action configured on a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    /// Action payload: reply text for `SendText` (supports `{placeholder}`
    /// templates), image path for `SendImage`, empty for `MarkRead`.
    pub payload: String,
    /// Delay before the action becomes eligible for dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Whether rule evaluation halts after the first full match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StopPolicy {
    /// Stop evaluating further rules once one fully matches.
    First,
    /// Evaluate every rule regardless of earlier matches.
    All,
}

/// A user-defined auto-reply rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub account_id: AccountId,
    pub name: String,
    /// Higher priority rules are evaluated (and win) first.
    pub priority: i32,
    /// Tie-breaker within equal priority; higher salience first.
    #[serde(default)]
    pub salience: i32,
    pub enabled: bool,
    pub matchers: Vec<MatcherSpec>,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    pub actions: Vec<ActionSpec>,
    pub stop_policy: StopPolicy,
    /// Optional lifetime trigger budget. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_triggers: Option<u32>,
    /// How many times this rule has fired.
    #[serde(default)]
    pub trigger_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Whether the trigger budget (if any) is exhausted.
    pub fn budget_exhausted(&self) -> bool {
        matches!(self.max_triggers, Some(max) if self.trigger_count >= max)
    }
}

// --- Queue tasks ---

/// Content category of a queue task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Text,
    Image,
    Mixed,
    MarkRead,
}

impl From<ActionKind> for TaskKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::SendText => TaskKind::Text,
            ActionKind::SendImage => TaskKind::Image,
            ActionKind::MarkRead => TaskKind::MarkRead,
        }
    }
}

/// Queue task lifecycle state.
///
/// Transitions are monotone along pending → processing → {completed, failed},
/// with processing → pending allowed only for retry and startup recovery.
/// Terminal states are never left.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Payload carried by a queue task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Rendered reply text for text tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image file path for image tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Optional caption accompanying an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Provenance metadata attached to a queue task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// The rule that produced this task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    /// The inbound message that triggered the rule, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_message_id: Option<MessageId>,
}

/// Input to `TaskQueue::enqueue`: everything except the queue-assigned
/// identity and lifecycle fields.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub kind: TaskKind,
    pub priority: i32,
    pub payload: TaskPayload,
    pub metadata: TaskMetadata,
    /// Earliest dispatch time. `None` means eligible immediately.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Override for the retry cap. `None` uses the queue default.
    pub max_retries: Option<u32>,
}

/// A durable outbound task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueTask {
    pub id: TaskId,
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub kind: TaskKind,
    pub priority: i32,
    pub status: TaskStatus,
    pub payload: TaskPayload,
    pub metadata: TaskMetadata,
    pub retries: u32,
    pub max_retries: u32,
    /// Earliest time the task may be dispatched.
    pub scheduled_at: DateTime<Utc>,
    /// When the most recent dispatch attempt started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Sender-assigned message id on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Receipt returned by the Sender collaborator on a successful delivery.
#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    /// Platform-assigned id of the delivered message, when the channel
    /// reports one.
    pub message_id: Option<MessageId>,
}

/// Record of a permanently failed task, kept for operator inspection.
///
/// Dead letters are append-only and never reprocessed automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub task_id: TaskId,
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub kind: TaskKind,
    pub payload: TaskPayload,
    pub error: String,
    pub retries: u32,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    /// Build a dead-letter record from a terminally failed task.
    pub fn from_task(task: &QueueTask, error: &str, failed_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id.clone(),
            account_id: task.account_id.clone(),
            chat_id: task.chat_id.clone(),
            kind: task.kind,
            payload: task.payload.clone(),
            error: error.to_string(),
            retries: task.retries,
            failed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn task_status_round_trips_as_text() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(TaskStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn action_kind_maps_to_task_kind() {
        assert_eq!(TaskKind::from(ActionKind::SendText), TaskKind::Text);
        assert_eq!(TaskKind::from(ActionKind::SendImage), TaskKind::Image);
        assert_eq!(TaskKind::from(ActionKind::MarkRead), TaskKind::MarkRead);
    }

    #[test]
    fn condition_spec_serde_tagging() {
        let cond = ConditionSpec::TextLength {
            min: Some(2),
            max: None,
        };
        let json = serde_json::to_string(&cond).unwrap();
        assert!(json.contains(r#""type":"text_length""#), "got: {json}");
        let parsed: ConditionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cond);
    }

    #[test]
    fn rule_budget_exhausted() {
        let mut rule = Rule {
            id: RuleId("r1".into()),
            account_id: AccountId("a1".into()),
            name: "test".into(),
            priority: 0,
            salience: 0,
            enabled: true,
            matchers: vec![],
            conditions: vec![],
            actions: vec![],
            stop_policy: StopPolicy::All,
            max_triggers: Some(2),
            trigger_count: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!rule.budget_exhausted());
        rule.trigger_count = 2;
        assert!(rule.budget_exhausted());
        rule.max_triggers = None;
        assert!(!rule.budget_exhausted());
    }

    #[test]
    fn dead_letter_copies_task_fields() {
        let now = Utc::now();
        let task = QueueTask {
            id: TaskId("t1".into()),
            account_id: AccountId("a1".into()),
            chat_id: ChatId("c1".into()),
            kind: TaskKind::Text,
            priority: 5,
            status: TaskStatus::Failed,
            payload: TaskPayload {
                text: Some("hello".into()),
                ..Default::default()
            },
            metadata: TaskMetadata::default(),
            retries: 3,
            max_retries: 3,
            scheduled_at: now,
            processed_at: None,
            completed_at: None,
            last_error: Some("boom".into()),
            result: None,
            created_at: now,
        };
        let entry = DeadLetterEntry::from_task(&task, "boom", now);
        assert_eq!(entry.task_id, task.id);
        assert_eq!(entry.retries, 3);
        assert_eq!(entry.error, "boom");
        assert_eq!(entry.payload.text.as_deref(), Some("hello"));
    }
}
