// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Riposte auto-reply pipeline.

use thiserror::Error;

/// The primary error type used across all Riposte collaborator traits and
/// core operations.
#[derive(Debug, Error)]
pub enum RiposteError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Sender collaborator errors (delivery failure, channel rejection).
    #[error("sender error: {message}")]
    Sender {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A rule could not be compiled (bad pattern, malformed condition).
    #[error("invalid rule {rule_id}: {message}")]
    InvalidRule { rule_id: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
