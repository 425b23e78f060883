// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Riposte auto-reply pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and implementations of the core
//! store traits (tasks, rules, dead letters) over one shared database.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod stores;

pub use database::Database;
pub use models::*;
pub use stores::{SqliteDeadLetterStore, SqliteRuleStore, SqliteTaskStore};
