// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./riposte.toml` > `~/.config/riposte/riposte.toml`
//! > `/etc/riposte/riposte.toml` with environment variable overrides via the
//! `RIPOSTE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RiposteConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/riposte/riposte.toml` (system-wide)
/// 3. `~/.config/riposte/riposte.toml` (user XDG config)
/// 4. `./riposte.toml` (local directory)
/// 5. `RIPOSTE_*` environment variables
pub fn load_config() -> Result<RiposteConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RiposteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RiposteConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RiposteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RiposteConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use, before extraction).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RiposteConfig::default()))
        .merge(Toml::file("/etc/riposte/riposte.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("riposte/riposte.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("riposte.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that keys containing
/// underscores survive: `RIPOSTE_QUEUE_MAX_RETRIES` must map to
/// `queue.max_retries`, not `queue.max.retries`.
fn env_provider() -> Env {
    Env::prefixed("RIPOSTE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: RIPOSTE_QUEUE_MAX_RETRIES -> "queue_max_retries"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("dedup_", "dedup.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[limits]
burst_max = 7

[storage]
database_path = "/tmp/r.db"
"#,
        )
        .unwrap();
        assert_eq!(config.limits.burst_max, 7);
        assert_eq!(config.storage.database_path, "/tmp/r.db");
        // Untouched sections keep defaults.
        assert_eq!(config.queue.max_retries, 3);
    }

    #[test]
    fn load_from_str_rejects_unknown_keys() {
        let result = load_config_from_str(
            r#"
[limits]
burst_maximum = 7
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.queue.tick_interval_ms, 1000);
        assert_eq!(config.dedup.max_entries, 4096);
    }
}
