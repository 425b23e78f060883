// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered sliding-window admission control.
//!
//! Scopes are checked burst → chat → account → global, short-circuiting on
//! the first denial. Every threshold is scaled by its scope's adaptive
//! multiplier (clamped to [0.5, 1.0]); a violation tightens the scope and
//! opens a cooldown during which the scope denies outright. A periodic
//! cleanup sweep prunes old timestamps and relaxes recovered scopes.
//!
//! The whole check-then-mutate sequence for a call runs under one lock; the
//! human-pacing sleep happens after the lock is released and never changes
//! the decision.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use riposte_bus::{Event, EventBus};
use riposte_config::RateLimitConfig;
use riposte_core::types::{AccountId, ChatId};

use crate::window::SlidingWindow;

/// Scope key for the process-wide window.
pub const GLOBAL_SCOPE: &str = "global";

const MULTIPLIER_FLOOR: f64 = 0.5;
const MULTIPLIER_CAP: f64 = 1.0;
const TIGHTEN_FACTOR: f64 = 0.8;
const RELAX_FACTOR: f64 = 1.2;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);

/// Scope key for an account's window.
pub fn account_scope_key(account_id: &AccountId) -> String {
    format!("account:{}", account_id.0)
}

/// Scope key for a chat's window (namespaced by account).
pub fn chat_scope_key(account_id: &AccountId, chat_id: &ChatId) -> String {
    format!("chat:{}:{}", account_id.0, chat_id.0)
}

/// Partial override for `update_config`: only the set fields change.
#[derive(Debug, Clone, Default)]
pub struct RateLimitOverrides {
    pub burst_max: Option<u32>,
    pub burst_window_secs: Option<u64>,
    pub chat_per_minute: Option<u32>,
    pub chat_per_hour: Option<u32>,
    pub account_per_minute: Option<u32>,
    pub global_per_minute: Option<u32>,
    pub global_per_hour: Option<u32>,
    pub global_per_day: Option<u32>,
    pub cooldown_secs: Option<u64>,
    pub pacing_threshold: Option<u32>,
    pub pacing_enabled: Option<bool>,
}

#[derive(Debug, Default)]
struct ScopeState {
    window: SlidingWindow,
    multiplier: Option<f64>, // None until first tightening; treated as 1.0
    cooldown_until: Option<Instant>,
}

impl ScopeState {
    fn multiplier(&self) -> f64 {
        self.multiplier.unwrap_or(MULTIPLIER_CAP)
    }

    fn is_neutral(&self) -> bool {
        self.window.is_empty() && self.multiplier.is_none() && self.cooldown_until.is_none()
    }
}

struct Inner {
    config: RateLimitConfig,
    scopes: HashMap<String, ScopeState>,
}

/// Multi-scope sliding-window rate limiter with adaptive tightening.
pub struct RateLimiter {
    inner: Mutex<Inner>,
    bus: EventBus,
}

enum Verdict {
    Allowed { pacing_delay: Option<Duration> },
    Denied,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, bus: EventBus) -> Self {
        Self {
            inner: Mutex::new(Inner {
                config,
                scopes: HashMap::new(),
            }),
            bus,
        }
    }

    /// May this (account, chat) pair send now?
    ///
    /// On a pass with non-trivial recent chat traffic, sleeps a bounded
    /// random delay before returning `true` to avoid an inhumanly regular
    /// send cadence. The delay never turns a pass into a denial.
    pub async fn check_limit(&self, account_id: &AccountId, chat_id: &ChatId) -> bool {
        let verdict = self.evaluate(account_id, chat_id);
        match verdict {
            Verdict::Denied => false,
            Verdict::Allowed { pacing_delay } => {
                if let Some(delay) = pacing_delay {
                    debug!(delay_ms = delay.as_millis() as u64, "human-pacing delay");
                    tokio::time::sleep(delay).await;
                }
                true
            }
        }
    }

    /// Record an actual send into every scope that covers it.
    pub fn record_send(&self, account_id: &AccountId, chat_id: &ChatId) {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("limiter state poisoned");
        for key in [
            chat_scope_key(account_id, chat_id),
            account_scope_key(account_id),
            GLOBAL_SCOPE.to_string(),
        ] {
            inner.scopes.entry(key).or_default().window.record(now);
        }
    }

    /// Apply a partial configuration override.
    pub fn update_config(&self, overrides: RateLimitOverrides) {
        let mut inner = self.inner.lock().expect("limiter state poisoned");
        let config = &mut inner.config;
        macro_rules! apply {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = overrides.$field { config.$field = value; })+
            };
        }
        apply!(
            burst_max,
            burst_window_secs,
            chat_per_minute,
            chat_per_hour,
            account_per_minute,
            global_per_minute,
            global_per_hour,
            global_per_day,
            cooldown_secs,
            pacing_threshold,
            pacing_enabled,
        );
        info!("rate limiter configuration updated");
    }

    /// Drop all scope state (windows, multipliers, cooldowns).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("limiter state poisoned");
        inner.scopes.clear();
        info!("rate limiter state reset");
    }

    /// One maintenance pass: prune stale timestamps and relax scopes whose
    /// cooldown has elapsed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("limiter state poisoned");
        let retention = Duration::from_secs(inner.config.retention_secs);

        let mut recovered = Vec::new();
        for (key, state) in inner.scopes.iter_mut() {
            state.window.prune(now, retention);

            if matches!(state.cooldown_until, Some(until) if until <= now) {
                state.cooldown_until = None;
                let relaxed = (state.multiplier() * RELAX_FACTOR).min(MULTIPLIER_CAP);
                state.multiplier = if (relaxed - MULTIPLIER_CAP).abs() < f64::EPSILON {
                    None
                } else {
                    Some(relaxed)
                };
                recovered.push((key.clone(), relaxed));
            }
        }

        inner.scopes.retain(|_, state| !state.is_neutral());
        drop(inner);

        for (scope, multiplier) in recovered {
            debug!(scope = %scope, multiplier, "cooldown elapsed, multiplier relaxed");
            self.bus.publish(Event::CooldownCleared { scope, multiplier });
        }
    }

    /// Run `cleanup` on the configured interval until cancelled.
    pub fn spawn_cleanup(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let interval_secs = {
            let inner = limiter.inner.lock().expect("limiter state poisoned");
            inner.config.cleanup_interval_secs
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => limiter.cleanup(),
                }
            }
            debug!("rate limiter cleanup loop stopped");
        })
    }

    /// Current adaptive multiplier for a scope, if the scope has state.
    pub fn multiplier_of(&self, scope: &str) -> Option<f64> {
        let inner = self.inner.lock().expect("limiter state poisoned");
        inner.scopes.get(scope).map(ScopeState::multiplier)
    }

    /// Whether a scope is currently inside a cooldown window.
    pub fn in_cooldown(&self, scope: &str) -> bool {
        let inner = self.inner.lock().expect("limiter state poisoned");
        matches!(
            inner.scopes.get(scope).and_then(|s| s.cooldown_until),
            Some(until) if until > Instant::now()
        )
    }

    /// The full check sequence under one lock.
    fn evaluate(&self, account_id: &AccountId, chat_id: &ChatId) -> Verdict {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("limiter state poisoned");
        let config = inner.config.clone();

        let chat_key = chat_scope_key(account_id, chat_id);
        let account_key = account_scope_key(account_id);

        // (scope key, window, raw threshold), in check order. The burst gate
        // runs first against the chat scope's window.
        let checks: [(&str, Duration, u32); 7] = [
            (
                chat_key.as_str(),
                Duration::from_secs(config.burst_window_secs),
                config.burst_max,
            ),
            (chat_key.as_str(), MINUTE, config.chat_per_minute),
            (chat_key.as_str(), HOUR, config.chat_per_hour),
            (account_key.as_str(), MINUTE, config.account_per_minute),
            (GLOBAL_SCOPE, MINUTE, config.global_per_minute),
            (GLOBAL_SCOPE, HOUR, config.global_per_hour),
            (GLOBAL_SCOPE, DAY, config.global_per_day),
        ];

        for (key, window, threshold) in checks {
            let state = inner.scopes.entry(key.to_string()).or_default();

            if matches!(state.cooldown_until, Some(until) if until > now) {
                debug!(scope = %key, "denied: scope in cooldown");
                return Verdict::Denied;
            }

            let effective = (f64::from(threshold) * state.multiplier()).floor() as usize;
            let count = state.window.count_within(now, window);
            if count >= effective {
                let tightened = (state.multiplier() * TIGHTEN_FACTOR).max(MULTIPLIER_FLOOR);
                state.multiplier = Some(tightened);
                state.cooldown_until = Some(now + Duration::from_secs(config.cooldown_secs));
                warn!(
                    scope = %key,
                    count,
                    effective,
                    multiplier = tightened,
                    "rate limit violated, scope tightened"
                );
                let scope = key.to_string();
                drop(inner);
                self.bus.publish(Event::AdaptiveTightened {
                    scope,
                    multiplier: tightened,
                });
                return Verdict::Denied;
            }
        }

        // Passed every gate; decide whether to pace like a human.
        let pacing_delay = if config.pacing_enabled {
            let recent = inner
                .scopes
                .get(&chat_key)
                .map(|s| s.window.count_within(now, MINUTE))
                .unwrap_or(0);
            (recent >= config.pacing_threshold as usize).then(sample_pacing_delay)
        } else {
            None
        };

        Verdict::Allowed { pacing_delay }
    }
}

/// Bounded random delay emulating human pacing: usually a few hundred
/// milliseconds, occasionally up to two seconds.
fn sample_pacing_delay() -> Duration {
    let mut rng = rand::thread_rng();
    let millis = if rng.gen_ratio(1, 8) {
        rng.gen_range(600..=2000)
    } else {
        rng.gen_range(150..=600)
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(config: RateLimitConfig) -> RateLimiter {
        RateLimiter::new(config, EventBus::new())
    }

    fn quiet_config() -> RateLimitConfig {
        RateLimitConfig {
            pacing_enabled: false,
            ..RateLimitConfig::default()
        }
    }

    fn ids() -> (AccountId, ChatId) {
        (AccountId("a1".into()), ChatId("c1".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_limit_three_per_five_seconds() {
        // Scenario: chat burst limit 3 per 5s; the fourth check within the
        // window is denied and opens a cooldown for that chat.
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();

        for _ in 0..3 {
            assert!(limiter.check_limit(&account, &chat).await);
            limiter.record_send(&account, &chat);
        }
        assert!(!limiter.check_limit(&account, &chat).await);

        let chat_scope = chat_scope_key(&account, &chat);
        assert!(limiter.in_cooldown(&chat_scope));
        let multiplier = limiter.multiplier_of(&chat_scope).unwrap();
        assert!((multiplier - 0.8).abs() < 1e-9, "got {multiplier}");
    }

    #[tokio::test(start_paused = true)]
    async fn denial_during_cooldown_regardless_of_counts() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();

        for _ in 0..3 {
            limiter.record_send(&account, &chat);
        }
        assert!(!limiter.check_limit(&account, &chat).await);

        // Window empties with time, but the cooldown still denies.
        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(!limiter.check_limit(&account, &chat).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_relaxes_after_cooldown() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();
        let chat_scope = chat_scope_key(&account, &chat);

        for _ in 0..3 {
            limiter.record_send(&account, &chat);
        }
        assert!(!limiter.check_limit(&account, &chat).await);
        assert!(limiter.in_cooldown(&chat_scope));

        // Past the 300s cooldown, a sweep clears it and relaxes the multiplier.
        tokio::time::advance(Duration::from_secs(301)).await;
        limiter.cleanup();

        assert!(!limiter.in_cooldown(&chat_scope));
        let multiplier = limiter.multiplier_of(&chat_scope).unwrap();
        assert!((multiplier - 0.96).abs() < 1e-9, "got {multiplier}");
        assert!(limiter.check_limit(&account, &chat).await);
    }

    #[tokio::test(start_paused = true)]
    async fn multiplier_never_leaves_bounds() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();
        let chat_scope = chat_scope_key(&account, &chat);

        // Repeated violation/recovery cycles stay inside [0.5, 1.0].
        for _ in 0..10 {
            for _ in 0..3 {
                limiter.record_send(&account, &chat);
            }
            assert!(!limiter.check_limit(&account, &chat).await);
            let m = limiter.multiplier_of(&chat_scope).unwrap();
            assert!((MULTIPLIER_FLOOR..=MULTIPLIER_CAP).contains(&m), "got {m}");
            tokio::time::advance(Duration::from_secs(301)).await;
            limiter.cleanup();
            if let Some(m) = limiter.multiplier_of(&chat_scope) {
                assert!((MULTIPLIER_FLOOR..=MULTIPLIER_CAP).contains(&m), "got {m}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tightened_scope_has_lower_effective_threshold() {
        let mut config = quiet_config();
        config.burst_max = 100; // keep the burst gate out of the way
        config.chat_per_minute = 6;
        let limiter = limiter(config);
        let (account, chat) = ids();
        let chat_scope = chat_scope_key(&account, &chat);

        // Force one violation on the chat scope via the minute cap.
        for _ in 0..6 {
            limiter.record_send(&account, &chat);
        }
        assert!(!limiter.check_limit(&account, &chat).await);

        // Recover from cooldown but keep the tightened multiplier (0.8 * 1.2
        // capped = 0.96); effective minute cap is now floor(6 * 0.96) = 5.
        tokio::time::advance(Duration::from_secs(301)).await;
        limiter.cleanup();
        assert!((limiter.multiplier_of(&chat_scope).unwrap() - 0.96).abs() < 1e-9);

        for _ in 0..5 {
            assert!(limiter.check_limit(&account, &chat).await);
            limiter.record_send(&account, &chat);
            tokio::time::advance(Duration::from_secs(6)).await;
        }
        // Five sends sit inside the minute window: the sixth check violates
        // the tightened cap even though the configured cap is six.
        assert!(!limiter.check_limit(&account, &chat).await);
    }

    #[tokio::test(start_paused = true)]
    async fn account_scope_counts_across_chats() {
        let mut config = quiet_config();
        config.account_per_minute = 2;
        let limiter = limiter(config);
        let account = AccountId("a1".into());

        for i in 0..2 {
            let chat = ChatId(format!("c{i}"));
            assert!(limiter.check_limit(&account, &chat).await);
            limiter.record_send(&account, &chat);
        }

        // A third chat is still blocked by the account-wide cap.
        let chat3 = ChatId("c99".into());
        assert!(!limiter.check_limit(&account, &chat3).await);
        assert!(limiter.in_cooldown(&account_scope_key(&account)));
    }

    #[tokio::test(start_paused = true)]
    async fn global_scope_counts_across_accounts() {
        let mut config = quiet_config();
        config.global_per_minute = 2;
        config.account_per_minute = 2;
        let limiter = limiter(config);

        for i in 0..2 {
            let account = AccountId(format!("a{i}"));
            let chat = ChatId("c1".into());
            assert!(limiter.check_limit(&account, &chat).await);
            limiter.record_send(&account, &chat);
        }

        let fresh_account = AccountId("a-fresh".into());
        let chat = ChatId("c1".into());
        assert!(!limiter.check_limit(&fresh_account, &chat).await);
        assert!(limiter.in_cooldown(GLOBAL_SCOPE));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_all_state() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();

        for _ in 0..3 {
            limiter.record_send(&account, &chat);
        }
        assert!(!limiter.check_limit(&account, &chat).await);

        limiter.reset();
        assert!(limiter.check_limit(&account, &chat).await);
        assert!(limiter.multiplier_of(&chat_scope_key(&account, &chat)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn update_config_applies_partial_override() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();

        limiter.update_config(RateLimitOverrides {
            burst_max: Some(1),
            ..Default::default()
        });

        assert!(limiter.check_limit(&account, &chat).await);
        limiter.record_send(&account, &chat);
        assert!(!limiter.check_limit(&account, &chat).await);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_delay_does_not_flip_decision() {
        let mut config = quiet_config();
        config.pacing_enabled = true;
        config.pacing_threshold = 1;
        let limiter = limiter(config);
        let (account, chat) = ids();

        limiter.record_send(&account, &chat);
        // The paused clock auto-advances through the sleep; the check still
        // passes despite the injected delay.
        assert!(limiter.check_limit(&account, &chat).await);
    }

    #[test]
    fn pacing_delay_is_bounded() {
        for _ in 0..200 {
            let delay = sample_pacing_delay();
            assert!(delay >= Duration::from_millis(150), "got {delay:?}");
            assert!(delay <= Duration::from_millis(2000), "got {delay:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_prunes_and_drops_neutral_scopes() {
        let limiter = limiter(quiet_config());
        let (account, chat) = ids();

        limiter.record_send(&account, &chat);
        tokio::time::advance(Duration::from_secs(86_401)).await;
        limiter.cleanup();

        // All timestamps aged out and nothing was tightened: scope is gone.
        assert!(limiter.multiplier_of(&chat_scope_key(&account, &chat)).is_none());
        assert!(limiter.check_limit(&account, &chat).await);
    }
}
