// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled rules and the per-rule-id compile cache.
//!
//! A [`CompiledRule`] is one rule's matchers and conditions pre-built into a
//! single evaluable unit. The [`RuleCache`] keys compiled rules by rule id
//! with a content fingerprint, so an account reload only recompiles rules
//! whose definition actually changed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use riposte_core::types::{AccountId, ActionSpec, Message, Rule, RuleId, StopPolicy};
use riposte_core::RiposteError;

use crate::condition::CompiledCondition;
use crate::matcher::{CompiledMatcher, RegexCache};

/// One rule's matchers, conditions, and actions in evaluable form.
#[derive(Debug)]
pub struct CompiledRule {
    pub id: RuleId,
    pub account_id: AccountId,
    pub name: String,
    pub priority: i32,
    pub salience: i32,
    pub stop_policy: StopPolicy,
    pub actions: Vec<ActionSpec>,
    max_triggers: Option<u32>,
    trigger_count: AtomicU32,
    matchers: Vec<CompiledMatcher>,
    conditions: Vec<CompiledCondition>,
}

impl CompiledRule {
    /// Compile a rule definition. Fails if any regex matcher fails to build.
    pub fn compile(rule: &Rule, regexes: &RegexCache) -> Result<Self, RiposteError> {
        let mut matchers = Vec::with_capacity(rule.matchers.len());
        for spec in &rule.matchers {
            let compiled =
                CompiledMatcher::compile(spec, regexes).map_err(|e| RiposteError::InvalidRule {
                    rule_id: rule.id.0.clone(),
                    message: format!("pattern `{}`: {e}", spec.pattern),
                })?;
            matchers.push(compiled);
        }

        let conditions = rule.conditions.iter().map(CompiledCondition::compile).collect();

        Ok(Self {
            id: rule.id.clone(),
            account_id: rule.account_id.clone(),
            name: rule.name.clone(),
            priority: rule.priority,
            salience: rule.salience,
            stop_policy: rule.stop_policy,
            actions: rule.actions.clone(),
            max_triggers: rule.max_triggers,
            trigger_count: AtomicU32::new(rule.trigger_count),
            matchers,
            conditions,
        })
    }

    /// Whether any matcher accepts the text.
    pub fn matches_text(&self, text: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(text))
    }

    /// Whether all conditions hold. Short-circuits on the first failure.
    pub fn conditions_met(&self, message: &Message, now: DateTime<Utc>) -> bool {
        self.conditions.iter().all(|c| c.holds(message, now))
    }

    /// Whether the trigger budget (if any) is spent.
    pub fn budget_exhausted(&self) -> bool {
        matches!(self.max_triggers, Some(max) if self.trigger_count.load(Ordering::Relaxed) >= max)
    }

    /// Record one firing against the in-memory budget counter.
    pub fn note_trigger(&self) {
        self.trigger_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current trigger count (in-memory view).
    pub fn trigger_count(&self) -> u32 {
        self.trigger_count.load(Ordering::Relaxed)
    }
}

/// Fingerprint of the parts of a rule that affect its compiled form.
///
/// Trigger bookkeeping and timestamps are deliberately excluded so a firing
/// does not look like a definition change.
pub fn rule_fingerprint(rule: &Rule) -> u64 {
    let content = serde_json::to_string(&(
        &rule.matchers,
        &rule.conditions,
        &rule.actions,
        rule.priority,
        rule.salience,
        &rule.stop_policy,
        rule.max_triggers,
        &rule.name,
    ))
    .unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Per-rule-id cache of compiled rules.
pub struct RuleCache {
    entries: DashMap<RuleId, (u64, Arc<CompiledRule>)>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached compiled form if the rule's fingerprint matches,
    /// otherwise compile and cache.
    pub fn get_or_compile(
        &self,
        rule: &Rule,
        regexes: &RegexCache,
    ) -> Result<Arc<CompiledRule>, RiposteError> {
        let fingerprint = rule_fingerprint(rule);
        if let Some(entry) = self.entries.get(&rule.id) {
            let (cached_fp, compiled) = entry.value();
            if *cached_fp == fingerprint {
                return Ok(Arc::clone(compiled));
            }
        }

        let compiled = Arc::new(CompiledRule::compile(rule, regexes)?);
        self.entries
            .insert(rule.id.clone(), (fingerprint, Arc::clone(&compiled)));
        Ok(compiled)
    }

    /// Drop the cached compiled form for a rule.
    pub fn invalidate(&self, rule_id: &RuleId) {
        self.entries.remove(rule_id);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new()
    }
}
