// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule matching engine for the Riposte auto-reply pipeline.
//!
//! Layers, leaves first: compiled matchers over message text (with a shared
//! bounded regex cache), pure conditions over message metadata and the
//! clock, compiled rules cached by rule id, and the [`RuleEngine`] that
//! evaluates an account's rules against each inbound message and hands fired
//! actions to an [`ActionSink`].

pub mod compiled;
pub mod condition;
pub mod engine;
pub mod matcher;
pub mod sink;
pub mod template;

pub use compiled::{CompiledRule, RuleCache};
pub use condition::CompiledCondition;
pub use engine::{ExplainEntry, ProcessReport, RuleEngine};
pub use matcher::{CompiledMatcher, RegexCache};
pub use sink::{ActionSink, FiredAction, SubmitReport};
