// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable task queue.
//!
//! A single logical ticker fetches due pending tasks, orders them by
//! (priority desc, scheduled_at asc), and dispatches through the configured
//! [`DispatchStrategy`](crate::dispatch::DispatchStrategy). The in-flight id
//! set is the sole concurrency guard: ids are claimed at selection time, so
//! a tick that overlaps a slow Sender call cannot pick the same task twice.
//!
//! Rate-limit denials defer the task without touching its retry counter.
//! Sender failures retry with linear backoff up to the cap, then the task is
//! dead-lettered and never revisited.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use riposte_bus::{Event, EventBus};
use riposte_config::QueueConfig;
use riposte_core::types::{
    DeadLetterEntry, QueueTask, TaskDraft, TaskId, TaskStatus,
};
use riposte_core::{DeadLetterStore, RiposteError, Sender, TaskStore};
use riposte_limiter::RateLimiter;

use crate::dispatch::{DispatchStrategy, SequentialDispatch};

/// Status counts for operator queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    /// Tasks currently claimed by a dispatch pass.
    pub in_flight: usize,
}

/// Durable, priority-ordered, rate-limited task processor.
pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    limiter: Arc<RateLimiter>,
    sender: Arc<dyn Sender>,
    dead_letters: Arc<dyn DeadLetterStore>,
    bus: EventBus,
    config: QueueConfig,
    strategy: Arc<dyn DispatchStrategy>,
    in_flight: Mutex<HashSet<TaskId>>,
    running: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

impl TaskQueue {
    /// Create a queue with the default sequential dispatch strategy.
    pub fn new(
        store: Arc<dyn TaskStore>,
        limiter: Arc<RateLimiter>,
        sender: Arc<dyn Sender>,
        dead_letters: Arc<dyn DeadLetterStore>,
        bus: EventBus,
        config: QueueConfig,
    ) -> Arc<Self> {
        Self::with_strategy(
            store,
            limiter,
            sender,
            dead_letters,
            bus,
            config,
            Arc::new(SequentialDispatch),
        )
    }

    /// Create a queue with an explicit dispatch strategy.
    #[allow(clippy::too_many_arguments)]
    pub fn with_strategy(
        store: Arc<dyn TaskStore>,
        limiter: Arc<RateLimiter>,
        sender: Arc<dyn Sender>,
        dead_letters: Arc<dyn DeadLetterStore>,
        bus: EventBus,
        config: QueueConfig,
        strategy: Arc<dyn DispatchStrategy>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            limiter,
            sender,
            dead_letters,
            bus,
            config,
            strategy,
            in_flight: Mutex::new(HashSet::new()),
            running: AtomicBool::new(false),
            cancel: Mutex::new(None),
        })
    }

    /// Recover orphaned tasks and start the scheduling loop. Idempotent.
    pub async fn start(self: &Arc<Self>) -> Result<(), RiposteError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.recover_processing().await?;

        let cancel = CancellationToken::new();
        *self.cancel.lock().expect("cancel slot poisoned") = Some(cancel.clone());

        let queue = Arc::clone(self);
        let tick = Duration::from_millis(self.config.tick_interval_ms);
        let maintenance_every = Duration::from_secs(self.config.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut maintenance = tokio::time::interval(maintenance_every);
            maintenance.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // Each pass runs detached so a slow Sender call never
                        // stalls the ticker; the in-flight set guards overlap.
                        let pass = Arc::clone(&queue);
                        tokio::spawn(async move { pass.run_tick().await });
                    }
                    _ = maintenance.tick() => queue.run_maintenance().await,
                }
            }
            debug!("task queue scheduling loop stopped");
        });

        info!(
            tick_ms = self.config.tick_interval_ms,
            max_retries = self.config.max_retries,
            "task queue started"
        );
        self.bus.publish(Event::QueueStarted);
        Ok(())
    }

    /// Stop the ticker and wait (bounded) for in-flight tasks to settle.
    /// Idempotent; never panics when already stopped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(cancel) = self.cancel.lock().expect("cancel slot poisoned").take() {
            cancel.cancel();
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.shutdown_timeout_secs);
        loop {
            let remaining = self.in_flight.lock().expect("in-flight set poisoned").len();
            if remaining == 0 {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(remaining, "shutdown timeout reached with tasks still in flight");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("task queue stopped");
        self.bus.publish(Event::QueueStopped);
    }

    /// Whether the scheduling loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Persist a new pending task. Works whether or not the loop is running;
    /// a stopped queue picks the task up on the next `start()`.
    pub async fn enqueue(&self, draft: TaskDraft) -> Result<TaskId, RiposteError> {
        let now = Utc::now();
        let id = TaskId(uuid::Uuid::new_v4().to_string());
        let task = QueueTask {
            id: id.clone(),
            account_id: draft.account_id,
            chat_id: draft.chat_id,
            kind: draft.kind,
            priority: draft.priority,
            status: TaskStatus::Pending,
            payload: draft.payload,
            metadata: draft.metadata,
            retries: 0,
            max_retries: draft.max_retries.unwrap_or(self.config.max_retries),
            scheduled_at: draft.scheduled_at.unwrap_or(now),
            processed_at: None,
            completed_at: None,
            last_error: None,
            result: None,
            created_at: now,
        };
        self.store.insert(&task).await?;
        debug!(task_id = %id.0, priority = task.priority, "task enqueued");
        self.bus.publish(Event::TaskEnqueued {
            task_id: id.0.clone(),
            account_id: task.account_id.0.clone(),
            priority: task.priority,
        });
        Ok(id)
    }

    /// Cancel a pending task. Returns `false` for tasks that are in flight,
    /// already terminal, or unknown.
    pub async fn cancel_task(&self, id: &TaskId) -> Result<bool, RiposteError> {
        if self.in_flight.lock().expect("in-flight set poisoned").contains(id) {
            return Ok(false);
        }
        match self.store.get(id).await? {
            Some(task) if task.status == TaskStatus::Pending => {
                let removed = self.store.delete(id).await?;
                if removed {
                    info!(task_id = %id.0, "pending task cancelled");
                    self.bus.publish(Event::TaskCancelled {
                        task_id: id.0.clone(),
                    });
                }
                Ok(removed)
            }
            _ => Ok(false),
        }
    }

    /// Status counts plus the current in-flight claim count.
    pub async fn stats(&self) -> Result<QueueStats, RiposteError> {
        Ok(QueueStats {
            pending: self.store.count_by_status(TaskStatus::Pending).await?,
            processing: self.store.count_by_status(TaskStatus::Processing).await?,
            completed: self.store.count_by_status(TaskStatus::Completed).await?,
            failed: self.store.count_by_status(TaskStatus::Failed).await?,
            in_flight: self.in_flight.lock().expect("in-flight set poisoned").len(),
        })
    }

    /// One scheduling pass: fetch due tasks, order, claim, dispatch.
    pub async fn run_tick(self: &Arc<Self>) {
        if !self.is_running() {
            return;
        }

        let now = Utc::now();
        let mut due = match self.store.find_pending(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "failed to fetch pending tasks");
                return;
            }
        };

        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });

        // Claim before dispatch so an overlapping tick skips these ids.
        let claimed: Vec<QueueTask> = {
            let mut in_flight = self.in_flight.lock().expect("in-flight set poisoned");
            due.into_iter()
                .filter(|task| in_flight.insert(task.id.clone()))
                .collect()
        };

        if claimed.is_empty() {
            return;
        }

        debug!(count = claimed.len(), "dispatching eligible tasks");
        let strategy = Arc::clone(&self.strategy);
        strategy.run(self, claimed).await;
    }

    /// Execute one dispatch attempt for a claimed task.
    ///
    /// Called by dispatch strategies; the claim is released on every exit
    /// path. Rate-limit denial reschedules without a retry increment; Sender
    /// failure or timeout feeds the retry/dead-letter path.
    pub async fn attempt(&self, mut task: QueueTask) {
        let _claim = ClaimGuard {
            queue: self,
            id: task.id.clone(),
        };

        let allowed = self
            .limiter
            .check_limit(&task.account_id, &task.chat_id)
            .await;
        if !allowed {
            let resume_at =
                Utc::now() + chrono::Duration::seconds(self.config.rate_limit_defer_secs as i64);
            task.scheduled_at = resume_at;
            if let Err(e) = self.store.update(&task).await {
                warn!(task_id = %task.id.0, error = %e, "failed to persist deferral");
                return;
            }
            debug!(task_id = %task.id.0, "rate limited, deferred");
            self.bus.publish(Event::TaskDeferred {
                task_id: task.id.0.clone(),
                resume_at,
            });
            return;
        }

        task.status = TaskStatus::Processing;
        task.processed_at = Some(Utc::now());
        if let Err(e) = self.store.update(&task).await {
            warn!(task_id = %task.id.0, error = %e, "failed to mark task processing");
            return;
        }

        let timeout = Duration::from_secs(self.config.send_timeout_secs);
        let outcome = tokio::time::timeout(timeout, self.sender.deliver(&task)).await;

        match outcome {
            Ok(Ok(receipt)) => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                task.result = receipt.message_id.as_ref().map(|id| id.0.clone());
                if let Err(e) = self.store.update(&task).await {
                    warn!(task_id = %task.id.0, error = %e, "failed to mark task completed");
                }
                self.limiter.record_send(&task.account_id, &task.chat_id);
                info!(task_id = %task.id.0, "task delivered");
                self.bus.publish(Event::TaskCompleted {
                    task_id: task.id.0.clone(),
                    message_id: task.result.clone(),
                });
            }
            Ok(Err(e)) => self.handle_failure(task, e.to_string()).await,
            Err(_) => {
                let message = RiposteError::Timeout { duration: timeout }.to_string();
                self.handle_failure(task, message).await;
            }
        }
    }

    /// Retry with linear backoff, or dead-letter once retries are exhausted.
    async fn handle_failure(&self, mut task: QueueTask, error: String) {
        task.retries += 1;
        task.last_error = Some(error.clone());

        if task.retries >= task.max_retries {
            task.status = TaskStatus::Failed;
            if let Err(e) = self.store.update(&task).await {
                warn!(task_id = %task.id.0, error = %e, "failed to mark task failed");
            }
            let entry = DeadLetterEntry::from_task(&task, &error, Utc::now());
            // Dead-letter archival must not take the pipeline down with it.
            if let Err(e) = self.dead_letters.save(&entry).await {
                error!(task_id = %task.id.0, error = %e, "dead-letter save failed");
            }
            error!(
                task_id = %task.id.0,
                retries = task.retries,
                error = %error,
                "task permanently failed"
            );
            self.bus.publish(Event::TaskFailed {
                task_id: task.id.0.clone(),
                error,
            });
        } else {
            let backoff = self.config.retry_delay_secs * u64::from(task.retries);
            let next_attempt_at = Utc::now() + chrono::Duration::seconds(backoff as i64);
            task.status = TaskStatus::Pending;
            task.scheduled_at = next_attempt_at;
            if let Err(e) = self.store.update(&task).await {
                warn!(task_id = %task.id.0, error = %e, "failed to persist retry");
                return;
            }
            warn!(
                task_id = %task.id.0,
                retries = task.retries,
                max_retries = task.max_retries,
                error = %error,
                "task failed, retry scheduled"
            );
            self.bus.publish(Event::TaskRetried {
                task_id: task.id.0.clone(),
                retries: task.retries,
                next_attempt_at,
            });
        }
    }

    /// Reset tasks left `processing` by an unclean shutdown back to
    /// `pending` with a short future `scheduled_at`.
    async fn recover_processing(&self) -> Result<(), RiposteError> {
        let orphaned = self.store.find_by_status(TaskStatus::Processing).await?;
        if orphaned.is_empty() {
            return Ok(());
        }

        let resume_at =
            Utc::now() + chrono::Duration::seconds(self.config.recovery_delay_secs as i64);
        for mut task in orphaned {
            task.status = TaskStatus::Pending;
            task.scheduled_at = resume_at;
            task.processed_at = None;
            self.store.update(&task).await?;
            info!(task_id = %task.id.0, "recovered task from unclean shutdown");
        }
        Ok(())
    }

    /// Prune completed tasks past the retention window.
    async fn run_maintenance(&self) {
        let cutoff =
            Utc::now() - chrono::Duration::seconds(self.config.completed_retention_secs as i64);
        match self.store.delete_old_completed(cutoff).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "pruned old completed tasks"),
            Err(e) => warn!(error = %e, "completed-task pruning failed"),
        }
    }
}

/// Releases a task's in-flight claim when an attempt finishes, on every path.
struct ClaimGuard<'a> {
    queue: &'a TaskQueue,
    id: TaskId,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.queue
            .in_flight
            .lock()
            .expect("in-flight set poisoned")
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riposte_config::RateLimitConfig;
    use riposte_test_utils::{make_draft, make_task, MemoryDeadLetterStore, MemoryTaskStore, MockSender};

    struct Fixture {
        queue: Arc<TaskQueue>,
        store: Arc<MemoryTaskStore>,
        sender: Arc<MockSender>,
        dead_letters: Arc<MemoryDeadLetterStore>,
        limiter: Arc<RateLimiter>,
    }

    fn fixture_with(config: QueueConfig, limits: RateLimitConfig) -> Fixture {
        let store = Arc::new(MemoryTaskStore::new());
        let sender = Arc::new(MockSender::new());
        let dead_letters = Arc::new(MemoryDeadLetterStore::new());
        let limiter = Arc::new(RateLimiter::new(limits, EventBus::new()));
        let queue = TaskQueue::new(
            store.clone(),
            limiter.clone(),
            sender.clone(),
            dead_letters.clone(),
            EventBus::new(),
            config,
        );
        Fixture {
            queue,
            store,
            sender,
            dead_letters,
            limiter,
        }
    }

    fn fixture() -> Fixture {
        let limits = RateLimitConfig {
            pacing_enabled: false,
            ..RateLimitConfig::default()
        };
        fixture_with(QueueConfig::default(), limits)
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_persists_pending_task() {
        let f = fixture();
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 7)).await.unwrap();

        let task = f.store.snapshot(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, 7);
        assert_eq!(task.max_retries, 3);
        assert_eq!(task.payload.text.as_deref(), Some("hi"));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_dispatches_by_priority_then_schedule() {
        // Scenario: two eligible tasks in the same tick; the priority-500
        // task dispatches before the older priority-100 task.
        let f = fixture();
        let mut old_low = make_task("low");
        old_low.priority = 100;
        old_low.scheduled_at = Utc::now() - chrono::Duration::seconds(10);
        f.store.seed(old_low);
        let mut high = make_task("high");
        high.priority = 500;
        f.store.seed(high);

        f.queue.start().await.unwrap();
        f.queue.run_tick().await;

        let delivered = f.sender.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].id.0, "high");
        assert_eq!(delivered[1].id.0, "low");
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn completed_task_records_send_and_result() {
        let f = fixture();
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();

        f.queue.start().await.unwrap();
        f.queue.run_tick().await;

        let task = f.store.snapshot(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert!(task.result.as_deref().unwrap().starts_with("mock-"));
        f.queue.stop().await;
    }

    /// Rewind a pending task's `scheduled_at` so the next tick sees it as due.
    fn make_due(store: &MemoryTaskStore, id: &TaskId) {
        let mut task = store.snapshot(id).unwrap();
        task.scheduled_at = Utc::now() - chrono::Duration::seconds(1);
        store.seed(task);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_dead_letter_after_exhaustion() {
        // Scenario: max_retries = 3; after the third failure the task is
        // `failed`, exactly one dead letter exists, and no fourth attempt
        // ever runs.
        let f = fixture();
        f.sender.fail_next(10, "boom");
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();
        f.queue.start().await.unwrap();

        for attempt in 1..=3u32 {
            f.queue.run_tick().await;
            let task = f.store.snapshot(&id).unwrap();
            assert_eq!(task.retries, attempt);
            if attempt < 3 {
                assert_eq!(task.status, TaskStatus::Pending);
                assert!(task.scheduled_at > Utc::now());
                // Skip the linear backoff for the next attempt.
                make_due(&f.store, &id);
            } else {
                assert_eq!(task.status, TaskStatus::Failed);
            }
        }

        assert_eq!(f.dead_letters.count().await.unwrap(), 1);
        let entry = &f.dead_letters.entries()[0];
        assert_eq!(entry.task_id, id);
        assert_eq!(entry.retries, 3);
        assert!(entry.error.contains("boom"));

        // A later tick never picks the failed task up again.
        f.queue.run_tick().await;
        assert_eq!(f.sender.delivered_count(), 3);
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backoff_is_linear_in_retry_count() {
        let f = fixture();
        f.sender.fail_next(2, "flaky");
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();
        f.queue.start().await.unwrap();

        let before = Utc::now();
        f.queue.run_tick().await;
        let task = f.store.snapshot(&id).unwrap();
        // First retry: +1 * 60s.
        let delta = (task.scheduled_at - before).num_seconds();
        assert!((59..=61).contains(&delta), "got {delta}");

        make_due(&f.store, &id);
        let before = Utc::now();
        f.queue.run_tick().await;
        let task = f.store.snapshot(&id).unwrap();
        // Second retry: +2 * 60s.
        let delta = (task.scheduled_at - before).num_seconds();
        assert!((119..=121).contains(&delta), "got {delta}");
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_deferral_is_not_a_retry() {
        let limits = RateLimitConfig {
            pacing_enabled: false,
            burst_max: 1,
            ..RateLimitConfig::default()
        };
        let f = fixture_with(QueueConfig::default(), limits);

        // Saturate the chat's burst budget so the next check denies.
        let account = riposte_core::types::AccountId("acct-1".into());
        let chat = riposte_core::types::ChatId("chat-1".into());
        f.limiter.record_send(&account, &chat);

        let id = f.queue.enqueue(make_draft("acct-1", "chat-1", "hi", 0)).await.unwrap();
        f.queue.start().await.unwrap();
        f.queue.run_tick().await;

        let task = f.store.snapshot(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 0, "deferral must not count as a retry");
        let delta = (task.scheduled_at - Utc::now()).num_seconds();
        assert!((58..=61).contains(&delta), "got {delta}");
        assert_eq!(f.sender.delivered_count(), 0);
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sender_timeout_feeds_retry_path() {
        let mut config = QueueConfig::default();
        config.send_timeout_secs = 1;
        let limits = RateLimitConfig {
            pacing_enabled: false,
            ..RateLimitConfig::default()
        };
        let f = fixture_with(config, limits);
        f.sender.set_latency(Duration::from_secs(5));

        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();
        f.queue.start().await.unwrap();
        f.queue.run_tick().await;

        let task = f.store.snapshot(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 1);
        assert!(task.last_error.as_deref().unwrap().contains("timed out"));
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn startup_recovery_resets_processing_tasks() {
        // Scenario: a task left `processing` by an unclean shutdown comes
        // back `pending` with a near-future schedule, not silently dropped.
        let f = fixture();
        let mut orphan = make_task("orphan");
        orphan.status = TaskStatus::Processing;
        orphan.processed_at = Some(Utc::now() - chrono::Duration::seconds(600));
        f.store.seed(orphan);

        f.queue.start().await.unwrap();

        let task = f.store.snapshot(&TaskId("orphan".into())).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.processed_at.is_none());
        let delta = (task.scheduled_at - Utc::now()).num_seconds();
        assert!((0..=5).contains(&delta), "got {delta}");
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_task_deletes_it() {
        let f = fixture();
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();

        assert!(f.queue.cancel_task(&id).await.unwrap());
        assert!(f.store.snapshot(&id).is_none());

        // Cancelling again (or an unknown id) reports false.
        assert!(!f.queue.cancel_task(&id).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_completed_task_returns_false() {
        let f = fixture();
        let id = f.queue.enqueue(make_draft("a1", "c1", "hi", 0)).await.unwrap();
        f.queue.start().await.unwrap();
        f.queue.run_tick().await;

        assert!(!f.queue.cancel_task(&id).await.unwrap());
        assert!(f.store.snapshot(&id).is_some());
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let f = fixture();
        f.queue.start().await.unwrap();
        f.queue.start().await.unwrap();
        assert!(f.queue.is_running());

        f.queue.stop().await;
        f.queue.stop().await;
        assert!(!f.queue.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reflect_lifecycle() {
        let f = fixture();
        f.sender.fail_next(3, "boom");
        let failing = f.queue.enqueue(make_draft("a1", "c1", "x", 0)).await.unwrap();
        f.queue.start().await.unwrap();

        for _ in 0..3 {
            f.queue.run_tick().await;
            if f.store.snapshot(&failing).unwrap().status == TaskStatus::Pending {
                make_due(&f.store, &failing);
            }
        }

        let ok = f.queue.enqueue(make_draft("a1", "c2", "y", 0)).await.unwrap();
        f.queue.run_tick().await;

        let stats = f.queue.stats().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.in_flight, 0);

        assert_eq!(f.store.snapshot(&ok).unwrap().status, TaskStatus::Completed);
        assert_eq!(f.store.snapshot(&failing).unwrap().status, TaskStatus::Failed);
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn future_scheduled_task_not_dispatched_early() {
        let f = fixture();
        let mut draft = make_draft("a1", "c1", "later", 0);
        draft.scheduled_at = Some(Utc::now() + chrono::Duration::seconds(120));
        let id = f.queue.enqueue(draft).await.unwrap();

        f.queue.start().await.unwrap();
        f.queue.run_tick().await;
        assert_eq!(f.sender.delivered_count(), 0);

        make_due(&f.store, &id);
        f.queue.run_tick().await;
        assert_eq!(f.sender.delivered_count(), 1);
        assert_eq!(f.store.snapshot(&id).unwrap().status, TaskStatus::Completed);
        f.queue.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_prunes_old_completed_tasks() {
        let f = fixture();
        let mut done = make_task("old-done");
        done.status = TaskStatus::Completed;
        done.completed_at = Some(Utc::now() - chrono::Duration::seconds(90_000));
        f.store.seed(done);

        f.queue.run_maintenance().await;
        assert!(f.store.snapshot(&TaskId("old-done".into())).is_none());
    }
}
