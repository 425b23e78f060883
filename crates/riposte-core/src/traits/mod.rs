// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Riposte pipeline.
//!
//! These are the seams the core consumes: the durable task store, the rule
//! store, the dead-letter store, and the Sender that performs the real side
//! effect. All use `#[async_trait]` for dynamic dispatch compatibility.

pub mod dead_letter;
pub mod rule_store;
pub mod sender;
pub mod task_store;

pub use dead_letter::DeadLetterStore;
pub use rule_store::RuleStore;
pub use sender::Sender;
pub use task_store::TaskStore;
