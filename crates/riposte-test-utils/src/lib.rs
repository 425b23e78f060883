// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Riposte integration tests.
//!
//! Provides a scripted [`MockSender`], in-memory implementations of the
//! store traits, and fixture builders, so pipeline tests can wire isolated
//! instances with zero external setup.

pub mod fixtures;
pub mod memory_stores;
pub mod mock_sender;

pub use fixtures::{make_draft, make_message, make_rule, make_task};
pub use memory_stores::{MemoryDeadLetterStore, MemoryRuleStore, MemoryTaskStore};
pub use mock_sender::MockSender;
