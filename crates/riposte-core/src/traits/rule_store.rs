// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule store trait: persistence for user-defined auto-reply rules.

use async_trait::async_trait;

use crate::error::RiposteError;
use crate::types::{AccountId, Rule, RuleId};

/// Persistence for auto-reply rules.
///
/// Rules are read-mostly: the engine loads an account's enabled rules once
/// and caches the compiled form until a mutation invalidates it.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All enabled rules for an account, in storage order. The engine applies
    /// its own (priority, salience) ordering.
    async fn find_enabled_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Rule>, RiposteError>;

    /// Fetch a rule by id.
    async fn get(&self, id: &RuleId) -> Result<Option<Rule>, RiposteError>;

    /// Persist a new rule.
    async fn insert(&self, rule: &Rule) -> Result<(), RiposteError>;

    /// Replace an existing rule.
    async fn update(&self, rule: &Rule) -> Result<(), RiposteError>;

    /// Delete a rule. Returns `true` if a row was removed.
    async fn delete(&self, id: &RuleId) -> Result<bool, RiposteError>;

    /// Enable or disable a rule without touching its definition.
    async fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<(), RiposteError>;

    /// Increment a rule's trigger count by one.
    async fn record_trigger(&self, id: &RuleId) -> Result<(), RiposteError>;
}
