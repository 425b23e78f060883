// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable, priority-ordered, rate-limited task queue for the Riposte
//! pipeline, plus the action builder and dedup gate that feed it.
//!
//! The [`OutboundDispatcher`] is the production `ActionSink` wiring: rule
//! engine → builder → dedup → [`TaskQueue::enqueue`]. The queue's scheduling
//! loop consults the rate limiter before every dispatch and archives
//! exhausted tasks to the dead-letter store.

pub mod builder;
pub mod dedup;
pub mod dispatch;
pub mod dispatcher;
pub mod queue;

pub use builder::build_draft;
pub use dedup::{dedup_key, DedupGate};
pub use dispatch::{DispatchStrategy, SequentialDispatch};
pub use dispatcher::OutboundDispatcher;
pub use queue::{QueueStats, TaskQueue};
