// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the core collaborator store traits.
//!
//! The three stores share one [`Database`] handle (one writer thread); each
//! trait method delegates to the typed query modules.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use riposte_core::types::{
    AccountId, DeadLetterEntry, QueueTask, Rule, RuleId, TaskId, TaskStatus,
};
use riposte_core::{DeadLetterStore, RiposteError, RuleStore, TaskStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    db: Arc<Database>,
}

impl SqliteTaskStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(&self, task: &QueueTask) -> Result<(), RiposteError> {
        queries::tasks::insert_task(&self.db, task).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<QueueTask>, RiposteError> {
        queries::tasks::get_task(&self.db, id).await
    }

    async fn update(&self, task: &QueueTask) -> Result<(), RiposteError> {
        queries::tasks::update_task(&self.db, task).await
    }

    async fn find_pending(&self, now: DateTime<Utc>) -> Result<Vec<QueueTask>, RiposteError> {
        queries::tasks::find_pending(&self.db, now).await
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<QueueTask>, RiposteError> {
        queries::tasks::find_by_status(&self.db, status).await
    }

    async fn count_by_status(&self, status: TaskStatus) -> Result<u64, RiposteError> {
        queries::tasks::count_by_status(&self.db, status).await
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RiposteError> {
        queries::tasks::delete_task(&self.db, id).await
    }

    async fn delete_old_completed(&self, cutoff: DateTime<Utc>) -> Result<u64, RiposteError> {
        queries::tasks::delete_old_completed(&self.db, cutoff).await
    }
}

/// SQLite-backed rule store.
pub struct SqliteRuleStore {
    db: Arc<Database>,
}

impl SqliteRuleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn find_enabled_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Rule>, RiposteError> {
        queries::rules::find_enabled_by_account(&self.db, account_id).await
    }

    async fn get(&self, id: &RuleId) -> Result<Option<Rule>, RiposteError> {
        queries::rules::get_rule(&self.db, id).await
    }

    async fn insert(&self, rule: &Rule) -> Result<(), RiposteError> {
        queries::rules::insert_rule(&self.db, rule).await
    }

    async fn update(&self, rule: &Rule) -> Result<(), RiposteError> {
        queries::rules::update_rule(&self.db, rule).await
    }

    async fn delete(&self, id: &RuleId) -> Result<bool, RiposteError> {
        queries::rules::delete_rule(&self.db, id).await
    }

    async fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<(), RiposteError> {
        queries::rules::set_enabled(&self.db, id, enabled).await
    }

    async fn record_trigger(&self, id: &RuleId) -> Result<(), RiposteError> {
        queries::rules::record_trigger(&self.db, id).await
    }
}

/// SQLite-backed dead-letter store.
pub struct SqliteDeadLetterStore {
    db: Arc<Database>,
}

impl SqliteDeadLetterStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeadLetterStore for SqliteDeadLetterStore {
    async fn save(&self, entry: &DeadLetterEntry) -> Result<(), RiposteError> {
        queries::dead_letters::save_entry(&self.db, entry).await
    }

    async fn count(&self) -> Result<u64, RiposteError> {
        queries::dead_letters::count_entries(&self.db).await
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<DeadLetterEntry>, RiposteError> {
        queries::dead_letters::find_recent(&self.db, limit).await
    }
}
