// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Riposte pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Riposte configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RiposteConfig {
    /// Rule engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Task queue scheduling and retry settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Rate limiter thresholds and adaptive behavior.
    #[serde(default)]
    pub limits: RateLimitConfig,

    /// Outbound action dedup settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Rule engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of compiled regexes kept in the shared cache.
    #[serde(default = "default_regex_cache_capacity")]
    pub regex_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regex_cache_capacity: default_regex_cache_capacity(),
        }
    }
}

fn default_regex_cache_capacity() -> usize {
    256
}

/// Task queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Scheduling loop tick interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Retry cap for failed deliveries.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit: a task's nth retry waits `n * retry_delay_secs`.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// How far a rate-limited task is pushed back. Not a retry.
    #[serde(default = "default_rate_limit_defer_secs")]
    pub rate_limit_defer_secs: u64,

    /// Upper bound on a single Sender delivery call.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// How long `stop()` waits for in-flight tasks to settle.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// How soon tasks recovered from an unclean shutdown become eligible.
    #[serde(default = "default_recovery_delay_secs")]
    pub recovery_delay_secs: u64,

    /// Interval of the maintenance sweep (completed-row retention).
    #[serde(default = "default_queue_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Completed tasks older than this are pruned by the sweep.
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            rate_limit_defer_secs: default_rate_limit_defer_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            recovery_delay_secs: default_recovery_delay_secs(),
            cleanup_interval_secs: default_queue_cleanup_interval_secs(),
            completed_retention_secs: default_completed_retention_secs(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_rate_limit_defer_secs() -> u64 {
    60
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_recovery_delay_secs() -> u64 {
    5
}

fn default_queue_cleanup_interval_secs() -> u64 {
    60
}

fn default_completed_retention_secs() -> u64 {
    86_400
}

/// Rate limiter configuration.
///
/// All thresholds are scaled by the owning scope's adaptive multiplier at
/// check time; the values here are the untightened ceilings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Burst gate: max sends per chat within the burst window.
    #[serde(default = "default_burst_max")]
    pub burst_max: u32,

    /// Burst window length in seconds.
    #[serde(default = "default_burst_window_secs")]
    pub burst_window_secs: u64,

    /// Per-chat sends per minute.
    #[serde(default = "default_chat_per_minute")]
    pub chat_per_minute: u32,

    /// Per-chat sends per hour.
    #[serde(default = "default_chat_per_hour")]
    pub chat_per_hour: u32,

    /// Per-account sends per minute. Defaults to half the global cap.
    #[serde(default = "default_account_per_minute")]
    pub account_per_minute: u32,

    /// Global sends per minute.
    #[serde(default = "default_global_per_minute")]
    pub global_per_minute: u32,

    /// Global sends per hour.
    #[serde(default = "default_global_per_hour")]
    pub global_per_hour: u32,

    /// Global sends per day.
    #[serde(default = "default_global_per_day")]
    pub global_per_day: u32,

    /// Length of the cooldown opened when a scope is violated.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Interval of the cleanup sweep (pruning + multiplier recovery).
    #[serde(default = "default_limiter_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Send timestamps older than this are pruned.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Inject human-pacing jitter once a chat has at least this many recent sends.
    #[serde(default = "default_pacing_threshold")]
    pub pacing_threshold: u32,

    /// Master switch for the pacing jitter.
    #[serde(default = "default_pacing_enabled")]
    pub pacing_enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst_max: default_burst_max(),
            burst_window_secs: default_burst_window_secs(),
            chat_per_minute: default_chat_per_minute(),
            chat_per_hour: default_chat_per_hour(),
            account_per_minute: default_account_per_minute(),
            global_per_minute: default_global_per_minute(),
            global_per_hour: default_global_per_hour(),
            global_per_day: default_global_per_day(),
            cooldown_secs: default_cooldown_secs(),
            cleanup_interval_secs: default_limiter_cleanup_interval_secs(),
            retention_secs: default_retention_secs(),
            pacing_threshold: default_pacing_threshold(),
            pacing_enabled: default_pacing_enabled(),
        }
    }
}

fn default_burst_max() -> u32 {
    3
}

fn default_burst_window_secs() -> u64 {
    5
}

fn default_chat_per_minute() -> u32 {
    6
}

fn default_chat_per_hour() -> u32 {
    60
}

fn default_account_per_minute() -> u32 {
    10
}

fn default_global_per_minute() -> u32 {
    20
}

fn default_global_per_hour() -> u32 {
    300
}

fn default_global_per_day() -> u32 {
    2000
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_limiter_cleanup_interval_secs() -> u64 {
    60
}

fn default_retention_secs() -> u64 {
    86_400
}

fn default_pacing_threshold() -> u32 {
    2
}

fn default_pacing_enabled() -> bool {
    true
}

/// Outbound dedup gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Trailing window within which an identical action is suppressed.
    #[serde(default = "default_dedup_ttl_secs")]
    pub ttl_secs: u64,

    /// Hard cap on remembered dedup keys.
    #[serde(default = "default_dedup_max_entries")]
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_dedup_ttl_secs(),
            max_entries: default_dedup_max_entries(),
        }
    }
}

fn default_dedup_ttl_secs() -> u64 {
    600
}

fn default_dedup_max_entries() -> usize {
    4096
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "riposte.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}
