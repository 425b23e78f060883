// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule engine: ordered evaluation of an account's rules against an
//! inbound message, with explain traces.
//!
//! Rule sets are cached per account as immutable snapshots
//! (`Arc<Vec<Arc<CompiledRule>>>`). A reload builds a fresh snapshot and
//! swaps it in, so an evaluation that is already running keeps the snapshot
//! it started with.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use riposte_bus::{Event, EventBus};
use riposte_config::EngineConfig;
use riposte_core::types::{AccountId, ActionKind, Message, Rule, RuleId, StopPolicy};
use riposte_core::{RiposteError, RuleStore};

use crate::compiled::{CompiledRule, RuleCache};
use crate::matcher::RegexCache;
use crate::sink::{ActionSink, FiredAction};
use crate::template;

/// Per-rule record of what the engine decided and why.
///
/// The explain trace is a first-class output: operators rely on it to
/// understand why a message did or did not produce a reply.
#[derive(Debug, Clone)]
pub struct ExplainEntry {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub matched: bool,
    pub reason: String,
    pub elapsed: Duration,
}

/// Structured result of `process_message`. Never raised as an error.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Whether the message was actually evaluated.
    pub processed: bool,
    /// How many rules fully matched.
    pub matched_count: usize,
    /// How many actions were handed to the queue (including dedup-suppressed).
    pub actions_triggered: usize,
    /// One entry per evaluated rule, in evaluation order.
    pub explain: Vec<ExplainEntry>,
    /// Why processing did not happen, when `processed` is false.
    pub error: Option<String>,
}

type RuleSetSnapshot = Arc<Vec<Arc<CompiledRule>>>;

/// Evaluates inbound messages against per-account rule sets and hands fired
/// actions to the queue.
pub struct RuleEngine {
    rule_store: Arc<dyn RuleStore>,
    sink: Arc<dyn ActionSink>,
    bus: EventBus,
    regexes: RegexCache,
    compiled: RuleCache,
    accounts: RwLock<HashMap<AccountId, RuleSetSnapshot>>,
    running: AtomicBool,
}

impl RuleEngine {
    pub fn new(
        rule_store: Arc<dyn RuleStore>,
        sink: Arc<dyn ActionSink>,
        bus: EventBus,
        config: &EngineConfig,
    ) -> Self {
        Self {
            rule_store,
            sink,
            bus,
            regexes: RegexCache::new(config.regex_cache_capacity),
            compiled: RuleCache::new(),
            accounts: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Start accepting messages. Idempotent.
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("rule engine started");
            self.bus.publish(Event::EngineStarted);
        }
    }

    /// Stop accepting messages. Idempotent; never panics when already stopped.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("rule engine stopped");
            self.bus.publish(Event::EngineStopped);
        }
    }

    /// Whether the engine is currently accepting messages.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Evaluate a message against the account's enabled rules.
    ///
    /// Never returns an error: engine-state and load failures come back as
    /// `processed = false` with the reason in `error`.
    pub async fn process_message(&self, account_id: &AccountId, message: &Message) -> ProcessReport {
        if !self.is_running() {
            return ProcessReport {
                processed: false,
                error: Some("rule engine is not running".to_string()),
                ..Default::default()
            };
        }

        // Never react to the account's own messages.
        if message.is_outgoing {
            return ProcessReport {
                processed: true,
                ..Default::default()
            };
        }

        let snapshot = match self.snapshot(account_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(account_id = %account_id.0, error = %e, "rule load failed");
                return ProcessReport {
                    processed: false,
                    error: Some(format!("failed to load rules: {e}")),
                    ..Default::default()
                };
            }
        };

        let mut report = ProcessReport {
            processed: true,
            ..Default::default()
        };
        let now = Utc::now();

        for rule in snapshot.iter() {
            let started = std::time::Instant::now();

            if rule.budget_exhausted() {
                report.explain.push(ExplainEntry {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    matched: false,
                    reason: "trigger budget exhausted".to_string(),
                    elapsed: started.elapsed(),
                });
                continue;
            }

            if !rule.conditions_met(message, now) {
                report.explain.push(ExplainEntry {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    matched: false,
                    reason: "conditions not met".to_string(),
                    elapsed: started.elapsed(),
                });
                continue;
            }

            if !rule.matches_text(&message.text) {
                report.explain.push(ExplainEntry {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    matched: false,
                    reason: "no matcher matched".to_string(),
                    elapsed: started.elapsed(),
                });
                continue;
            }

            // Full match: bookkeeping, then hand actions to the queue.
            report.matched_count += 1;
            rule.note_trigger();
            if let Err(e) = self.rule_store.record_trigger(&rule.id).await {
                warn!(rule_id = %rule.id.0, error = %e, "trigger bookkeeping write failed");
            }

            let actions = build_fired_actions(rule, account_id, message);
            let action_count = actions.len();
            let reason = match self.sink.submit(actions).await {
                Ok(submit) => {
                    report.actions_triggered += submit.triggered();
                    self.bus.publish(Event::RuleTriggered {
                        rule_id: rule.id.0.clone(),
                        account_id: account_id.0.clone(),
                        message_id: message.id.0.clone(),
                        actions: submit.triggered(),
                    });
                    if submit.deduplicated > 0 {
                        format!(
                            "matched; {} enqueued, {} duplicate",
                            submit.enqueued.len(),
                            submit.deduplicated
                        )
                    } else {
                        "matched".to_string()
                    }
                }
                Err(e) => {
                    warn!(rule_id = %rule.id.0, error = %e, "action submit failed");
                    format!("matched; submit failed for {action_count} action(s): {e}")
                }
            };

            report.explain.push(ExplainEntry {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                matched: true,
                reason,
                elapsed: started.elapsed(),
            });

            if rule.stop_policy == StopPolicy::First {
                debug!(rule_id = %rule.id.0, "stop policy `first`: halting evaluation");
                break;
            }
        }

        report
    }

    /// Dry-run a single rule against a sample message.
    ///
    /// Compiles the rule in isolation and evaluates it without touching
    /// trigger counts, caches, or the queue.
    pub fn test_rule(&self, rule: &Rule, message: &Message) -> Result<ExplainEntry, RiposteError> {
        let compiled = CompiledRule::compile(rule, &self.regexes)?;
        let started = std::time::Instant::now();
        let now = Utc::now();

        let (matched, reason) = if !compiled.conditions_met(message, now) {
            (false, "conditions not met".to_string())
        } else if !compiled.matches_text(&message.text) {
            (false, "no matcher matched".to_string())
        } else {
            (true, "matched".to_string())
        };

        Ok(ExplainEntry {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            matched,
            reason,
            elapsed: started.elapsed(),
        })
    }

    /// Force-reload an account's rules from the store. Returns how many
    /// enabled rules the fresh snapshot holds.
    pub async fn reload_account(&self, account_id: &AccountId) -> Result<usize, RiposteError> {
        let snapshot = self.load_snapshot(account_id).await?;
        let count = snapshot.len();
        self.accounts
            .write()
            .await
            .insert(account_id.clone(), snapshot);
        debug!(account_id = %account_id.0, rules = count, "account rule set reloaded");
        Ok(count)
    }

    /// Invalidate caches after a rule mutation. The next message for the
    /// account reloads and recompiles as needed.
    pub async fn invalidate_rule(&self, account_id: &AccountId, rule_id: &RuleId) {
        self.compiled.invalidate(rule_id);
        self.accounts.write().await.remove(account_id);
    }

    /// Drop all cached rule sets (e.g. after a bulk import).
    pub async fn invalidate_all(&self) {
        self.compiled.clear();
        self.accounts.write().await.clear();
    }

    /// Current snapshot for an account, loading on first use.
    async fn snapshot(&self, account_id: &AccountId) -> Result<RuleSetSnapshot, RiposteError> {
        if let Some(snapshot) = self.accounts.read().await.get(account_id) {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = self.load_snapshot(account_id).await?;
        self.accounts
            .write()
            .await
            .insert(account_id.clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Load, compile, and order an account's enabled rules.
    ///
    /// Ordering: priority desc, then salience desc, then rule id for a stable
    /// tiebreak. A rule that fails to compile is skipped with a warning; the
    /// rest of the set still loads.
    async fn load_snapshot(&self, account_id: &AccountId) -> Result<RuleSetSnapshot, RiposteError> {
        let rules = self.rule_store.find_enabled_by_account(account_id).await?;

        let mut compiled: Vec<Arc<CompiledRule>> = Vec::with_capacity(rules.len());
        for rule in &rules {
            match self.compiled.get_or_compile(rule, &self.regexes) {
                Ok(c) => compiled.push(c),
                Err(e) => {
                    warn!(rule_id = %rule.id.0, error = %e, "skipping rule that failed to compile");
                }
            }
        }

        compiled.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.salience.cmp(&a.salience))
                .then(a.id.0.cmp(&b.id.0))
        });

        Ok(Arc::new(compiled))
    }
}

/// Convert a matched rule's enabled actions into fired actions with rendered
/// payloads.
fn build_fired_actions(
    rule: &CompiledRule,
    account_id: &AccountId,
    message: &Message,
) -> Vec<FiredAction> {
    rule.actions
        .iter()
        .filter(|action| action.enabled)
        .map(|action| {
            let payload = match action.kind {
                // Only text payloads are templates; image paths and mark-read
                // payloads pass through untouched.
                ActionKind::SendText => template::render(&action.payload, message),
                ActionKind::SendImage | ActionKind::MarkRead => action.payload.clone(),
            };
            FiredAction {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                account_id: account_id.clone(),
                chat_id: message.chat_id.clone(),
                trigger_message_id: message.id.clone(),
                kind: action.kind,
                payload,
                delay_ms: action.delay_ms,
                priority: rule.priority,
            }
        })
        .collect()
}
