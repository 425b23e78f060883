// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Riposte auto-reply pipeline.
//!
//! This crate provides the foundational domain types, the error type, and
//! the collaborator traits consumed throughout the Riposte workspace. The
//! rule engine, task queue, and rate limiter are built on top of these
//! definitions in their own crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RiposteError;
pub use types::{
    AccountId, ChatId, ChatKind, DeadLetterEntry, Message, MessageId, QueueTask, Rule, RuleId,
    SendReceipt, TaskDraft, TaskId, TaskKind, TaskStatus,
};

// Re-export collaborator traits at crate root.
pub use traits::{DeadLetterStore, RuleStore, Sender, TaskStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn riposte_error_variants_construct() {
        let _config = RiposteError::Config("test".into());
        let _storage = RiposteError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _sender = RiposteError::Sender {
            message: "test".into(),
            source: None,
        };
        let _rule = RiposteError::InvalidRule {
            rule_id: "r1".into(),
            message: "bad regex".into(),
        };
        let _timeout = RiposteError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = RiposteError::Internal("test".into());
    }

    #[test]
    fn error_display_includes_context() {
        let err = RiposteError::InvalidRule {
            rule_id: "r-7".into(),
            message: "unclosed group".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("r-7"), "got: {msg}");
        assert!(msg.contains("unclosed group"), "got: {msg}");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that the collaborator traits are object safe
        // and reachable through the public API.
        fn _assert_sender(_: &dyn Sender) {}
        fn _assert_task_store(_: &dyn TaskStore) {}
        fn _assert_rule_store(_: &dyn RuleStore) {}
        fn _assert_dead_letter(_: &dyn DeadLetterStore) {}
    }
}
