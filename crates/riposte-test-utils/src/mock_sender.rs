// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock Sender for deterministic testing.
//!
//! `MockSender` captures every delivered task and replays scripted outcomes:
//! queued failures are consumed first, after which deliveries succeed.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use riposte_core::types::{MessageId, QueueTask, SendReceipt};
use riposte_core::{RiposteError, Sender};

enum ScriptedOutcome {
    Success,
    Failure(String),
}

/// A Sender that records deliveries and fails on demand.
#[derive(Default)]
pub struct MockSender {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    delivered: Mutex<Vec<QueueTask>>,
    latency: Mutex<Option<Duration>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `n` failures; subsequent deliveries succeed again.
    pub fn fail_next(&self, n: usize, error: &str) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..n {
            script.push_back(ScriptedOutcome::Failure(error.to_string()));
        }
    }

    /// Queue one explicit success (useful between scripted failures).
    pub fn succeed_next(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedOutcome::Success);
    }

    /// Make every delivery take this long (for timeout tests).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Every task passed to `deliver`, in call order.
    pub fn delivered(&self) -> Vec<QueueTask> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl Sender for MockSender {
    async fn deliver(&self, task: &QueueTask) -> Result<SendReceipt, RiposteError> {
        self.delivered.lock().unwrap().push(task.clone());

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(ScriptedOutcome::Failure(message)) => Err(RiposteError::Sender {
                message,
                source: None,
            }),
            Some(ScriptedOutcome::Success) | None => Ok(SendReceipt {
                message_id: Some(MessageId(format!("mock-{}", uuid::Uuid::new_v4()))),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::make_task;

    #[tokio::test]
    async fn default_outcome_is_success() {
        let sender = MockSender::new();
        let receipt = sender.deliver(&make_task("t1")).await.unwrap();
        assert!(receipt.message_id.is_some());
        assert_eq!(sender.delivered_count(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let sender = MockSender::new();
        sender.fail_next(2, "connection reset");

        assert!(sender.deliver(&make_task("t1")).await.is_err());
        assert!(sender.deliver(&make_task("t1")).await.is_err());
        assert!(sender.deliver(&make_task("t1")).await.is_ok());
        assert_eq!(sender.delivered_count(), 3);
    }
}
