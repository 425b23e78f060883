// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable per-tick dispatch strategies.
//!
//! The reference behavior dispatches the tick's tasks one at a time,
//! awaiting each Sender call before moving to the next. That sequencing
//! bounds throughput to one task per Sender round-trip but spaces sends
//! naturally; parallel dispatch is a deliberate opt-in via this trait, and
//! any such strategy must keep per-task and per-limiter-scope serialization.

use async_trait::async_trait;

use riposte_core::types::QueueTask;

use crate::queue::TaskQueue;

/// Runs the dispatch attempts for one scheduling pass. Every task handed in
/// has already been claimed in the queue's in-flight set.
#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    async fn run(&self, queue: &TaskQueue, tasks: Vec<QueueTask>);
}

/// The default strategy: strictly sequential attempts within a pass.
pub struct SequentialDispatch;

#[async_trait]
impl DispatchStrategy for SequentialDispatch {
    async fn run(&self, queue: &TaskQueue, tasks: Vec<QueueTask>) {
        for task in tasks {
            queue.attempt(task).await;
        }
    }
}
