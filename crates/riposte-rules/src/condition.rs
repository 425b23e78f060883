// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled rule conditions.
//!
//! Conditions are pure functions of the message plus the caller-supplied
//! clock; they never touch shared state. A rule is eligible only when all of
//! its conditions hold, and evaluation short-circuits on the first failure.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};

use riposte_core::types::{ChatKind, ConditionSpec, Message};

/// A condition compiled into its evaluable form.
#[derive(Debug, Clone)]
pub enum CompiledCondition {
    TimeWindow {
        start: NaiveTime,
        end: NaiveTime,
        weekdays: Option<HashSet<Weekday>>,
    },
    ChatKind {
        kind: ChatKind,
    },
    SenderAllow {
        senders: HashSet<String>,
    },
    SenderDeny {
        senders: HashSet<String>,
    },
    TextLength {
        min: Option<usize>,
        max: Option<usize>,
    },
}

impl CompiledCondition {
    /// Compile a condition spec. List conditions become set lookups.
    pub fn compile(spec: &ConditionSpec) -> Self {
        match spec {
            ConditionSpec::TimeWindow {
                start,
                end,
                weekdays,
            } => Self::TimeWindow {
                start: *start,
                end: *end,
                weekdays: weekdays
                    .as_ref()
                    .map(|days| days.iter().copied().collect()),
            },
            ConditionSpec::ChatKind { kind } => Self::ChatKind { kind: *kind },
            ConditionSpec::SenderAllow { senders } => Self::SenderAllow {
                senders: senders.iter().cloned().collect(),
            },
            ConditionSpec::SenderDeny { senders } => Self::SenderDeny {
                senders: senders.iter().cloned().collect(),
            },
            ConditionSpec::TextLength { min, max } => Self::TextLength {
                min: *min,
                max: *max,
            },
        }
    }

    /// Whether this condition holds for the message at the given instant.
    pub fn holds(&self, message: &Message, now: DateTime<Utc>) -> bool {
        match self {
            Self::TimeWindow {
                start,
                end,
                weekdays,
            } => {
                if let Some(days) = weekdays {
                    if !days.contains(&now.weekday()) {
                        return false;
                    }
                }
                time_in_window(now.time(), *start, *end)
            }
            Self::ChatKind { kind } => message.chat_kind == *kind,
            Self::SenderAllow { senders } => senders.contains(&message.sender_id),
            Self::SenderDeny { senders } => !senders.contains(&message.sender_id),
            Self::TextLength { min, max } => {
                let len = message.text.chars().count();
                min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
            }
        }
    }
}

/// Half-open window check. `start == end` covers the full day; `start > end`
/// wraps across midnight.
fn time_in_window(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        true
    } else if start < end {
        t >= start && t < end
    } else {
        t >= start || t < end
    }
}
