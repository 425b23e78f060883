// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementations for tests.
//!
//! Behaviorally equivalent to the SQLite stores but with zero setup, so
//! engine/queue tests can run against isolated instances.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use riposte_core::types::{
    AccountId, DeadLetterEntry, QueueTask, Rule, RuleId, TaskId, TaskStatus,
};
use riposte_core::{DeadLetterStore, RiposteError, RuleStore, TaskStore};

/// Task store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, QueueTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct snapshot of a task for assertions.
    pub fn snapshot(&self, id: &TaskId) -> Option<QueueTask> {
        self.tasks.lock().unwrap().get(id).cloned()
    }

    /// Total number of stored tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }

    /// Insert a task bypassing the queue (for recovery tests).
    pub fn seed(&self, task: QueueTask) {
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: &QueueTask) -> Result<(), RiposteError> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<QueueTask>, RiposteError> {
        Ok(self.tasks.lock().unwrap().get(id).cloned())
    }

    async fn update(&self, task: &QueueTask) -> Result<(), RiposteError> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_pending(&self, now: DateTime<Utc>) -> Result<Vec<QueueTask>, RiposteError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TaskStatus::Pending && t.scheduled_at <= now)
            .cloned()
            .collect())
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<QueueTask>, RiposteError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, status: TaskStatus) -> Result<u64, RiposteError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == status)
            .count() as u64)
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RiposteError> {
        Ok(self.tasks.lock().unwrap().remove(id).is_some())
    }

    async fn delete_old_completed(&self, cutoff: DateTime<Utc>) -> Result<u64, RiposteError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|_, t| {
            !(t.status == TaskStatus::Completed
                && matches!(t.completed_at, Some(at) if at < cutoff))
        });
        Ok((before - tasks.len()) as u64)
    }
}

/// Rule store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<HashMap<RuleId, Rule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, rule: Rule) {
        self.rules.lock().unwrap().insert(rule.id.clone(), rule);
    }

    pub fn snapshot(&self, id: &RuleId) -> Option<Rule> {
        self.rules.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_enabled_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Rule>, RiposteError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.enabled && &r.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &RuleId) -> Result<Option<Rule>, RiposteError> {
        Ok(self.rules.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, rule: &Rule) -> Result<(), RiposteError> {
        self.rules
            .lock()
            .unwrap()
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &Rule) -> Result<(), RiposteError> {
        self.rules
            .lock()
            .unwrap()
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<bool, RiposteError> {
        Ok(self.rules.lock().unwrap().remove(id).is_some())
    }

    async fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<(), RiposteError> {
        if let Some(rule) = self.rules.lock().unwrap().get_mut(id) {
            rule.enabled = enabled;
            rule.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_trigger(&self, id: &RuleId) -> Result<(), RiposteError> {
        if let Some(rule) = self.rules.lock().unwrap().get_mut(id) {
            rule.trigger_count += 1;
        }
        Ok(())
    }
}

/// Append-only dead-letter store backed by a vector.
#[derive(Default)]
pub struct MemoryDeadLetterStore {
    entries: Mutex<Vec<DeadLetterEntry>>,
}

impl MemoryDeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterStore for MemoryDeadLetterStore {
    async fn save(&self, entry: &DeadLetterEntry) -> Result<(), RiposteError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64, RiposteError> {
        Ok(self.entries.lock().unwrap().len() as u64)
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<DeadLetterEntry>, RiposteError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::make_task;

    #[tokio::test]
    async fn task_store_find_pending_filters_status_and_schedule() {
        let store = MemoryTaskStore::new();
        let now = Utc::now();

        let due = make_task("due");
        let mut future = make_task("future");
        future.scheduled_at = now + chrono::Duration::seconds(60);
        let mut done = make_task("done");
        done.status = TaskStatus::Completed;

        store.insert(&due).await.unwrap();
        store.insert(&future).await.unwrap();
        store.insert(&done).await.unwrap();

        let pending = store.find_pending(now).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.0, "due");
    }

    #[tokio::test]
    async fn dead_letter_find_recent_is_newest_first() {
        let store = MemoryDeadLetterStore::new();
        for i in 0..3 {
            let entry = DeadLetterEntry::from_task(&make_task(&format!("t{i}")), "err", Utc::now());
            store.save(&entry).await.unwrap();
        }
        let recent = store.find_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].task_id.0, "t2");
        assert_eq!(store.count().await.unwrap(), 3);
    }
}
