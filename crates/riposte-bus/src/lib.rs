// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for the Riposte pipeline.
//!
//! Lifecycle notifications (task completed, rate-limit tightened, rule
//! triggered, ...) are published as typed events over a `tokio::sync::broadcast`
//! channel. Publishing is fire-and-forget: a publish with no subscribers, or
//! to a lagged subscriber, never blocks or fails the publishing component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default broadcast channel capacity. Slow subscribers past this lag lose
/// the oldest events, never block the pipeline.
const DEFAULT_CAPACITY: usize = 256;

/// A lifecycle event emitted by a pipeline component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A task was accepted into the queue.
    TaskEnqueued { task_id: String, account_id: String, priority: i32 },
    /// Dispatch was deferred by the rate limiter (not a failure).
    TaskDeferred { task_id: String, resume_at: DateTime<Utc> },
    /// A task was delivered successfully.
    TaskCompleted { task_id: String, message_id: Option<String> },
    /// A task attempt failed and a retry was scheduled.
    TaskRetried { task_id: String, retries: u32, next_attempt_at: DateTime<Utc> },
    /// A task exhausted its retries and was dead-lettered.
    TaskFailed { task_id: String, error: String },
    /// A pending task was cancelled before dispatch.
    TaskCancelled { task_id: String },
    /// A rule fully matched a message.
    RuleTriggered {
        rule_id: String,
        account_id: String,
        message_id: String,
        actions: usize,
    },
    /// A rate-limiter scope tightened its adaptive multiplier.
    AdaptiveTightened { scope: String, multiplier: f64 },
    /// A rate-limiter scope's cooldown elapsed and its multiplier relaxed.
    CooldownCleared { scope: String, multiplier: f64 },
    /// The task queue started its scheduling loop.
    QueueStarted,
    /// The task queue stopped.
    QueueStopped,
    /// The rule engine started accepting messages.
    EngineStarted,
    /// The rule engine stopped.
    EngineStopped,
}

/// An event wrapped with its publication identity and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub published_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

/// Fire-and-forget broadcast bus for pipeline lifecycle events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Never blocks; if no subscriber is listening the
    /// event is dropped silently.
    pub fn publish(&self, event: Event) {
        let envelope = Envelope {
            id: uuid::Uuid::new_v4().to_string(),
            published_at: Utc::now(),
            event,
        };
        trace!(event = ?envelope.event, "bus publish");
        // A send error only means there are currently no receivers.
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Number of live subscribers (for diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::QueueStarted);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, Event::QueueStarted);
        assert!(!envelope.id.is_empty());
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(Event::TaskCancelled {
            task_id: "t1".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::AdaptiveTightened {
            scope: "chat:a:c".into(),
            multiplier: 0.8,
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.event, e2.event);
    }

    #[tokio::test]
    async fn subscriber_only_sees_events_after_subscribe() {
        let bus = EventBus::new();
        bus.publish(Event::QueueStarted);

        let mut rx = bus.subscribe();
        bus.publish(Event::QueueStopped);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, Event::QueueStopped);
    }

    #[test]
    fn envelope_serializes_with_flattened_event() {
        let envelope = Envelope {
            id: "e1".into(),
            published_at: Utc::now(),
            event: Event::TaskFailed {
                task_id: "t9".into(),
                error: "timeout".into(),
            },
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""kind":"task_failed""#), "got: {json}");
        assert!(json.contains(r#""task_id":"t9""#), "got: {json}");
    }
}
