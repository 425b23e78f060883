// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: positive windows, non-zero capacities, non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::RiposteConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RiposteConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.queue.tick_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.tick_interval_ms must be greater than 0".to_string(),
        });
    }

    if config.queue.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_retries must be at least 1".to_string(),
        });
    }

    if config.limits.burst_max == 0 || config.limits.burst_window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "limits.burst_max and limits.burst_window_secs must be greater than 0"
                .to_string(),
        });
    }

    for (name, value) in [
        ("limits.chat_per_minute", config.limits.chat_per_minute),
        ("limits.chat_per_hour", config.limits.chat_per_hour),
        ("limits.account_per_minute", config.limits.account_per_minute),
        ("limits.global_per_minute", config.limits.global_per_minute),
        ("limits.global_per_hour", config.limits.global_per_hour),
        ("limits.global_per_day", config.limits.global_per_day),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be greater than 0"),
            });
        }
    }

    if config.limits.account_per_minute > config.limits.global_per_minute {
        errors.push(ConfigError::Validation {
            message: format!(
                "limits.account_per_minute ({}) must not exceed limits.global_per_minute ({})",
                config.limits.account_per_minute, config.limits.global_per_minute
            ),
        });
    }

    if config.dedup.max_entries == 0 {
        errors.push(ConfigError::Validation {
            message: "dedup.max_entries must be at least 1".to_string(),
        });
    }

    if config.engine.regex_cache_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.regex_cache_capacity must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
