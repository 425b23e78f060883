// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dedup gate.
//!
//! Suppresses duplicate outbound actions when an upstream source redelivers
//! the same event. Keys hash (account, chat, trigger message, action kind,
//! payload); entries live for a trailing TTL and the map is additionally
//! size-capped. Both bounds are enforced on every insert.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use riposte_core::types::{AccountId, ActionKind, ChatId, MessageId};

/// Hash key for an outbound action.
pub fn dedup_key(
    account_id: &AccountId,
    chat_id: &ChatId,
    trigger_message_id: &MessageId,
    kind: ActionKind,
    payload: &str,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    account_id.0.hash(&mut hasher);
    chat_id.0.hash(&mut hasher);
    trigger_message_id.0.hash(&mut hasher);
    kind.hash(&mut hasher);
    payload.hash(&mut hasher);
    hasher.finish()
}

struct Inner {
    entries: HashMap<u64, Instant>,
    order: VecDeque<(u64, Instant)>,
}

/// Bounded map of recently seen action keys.
pub struct DedupGate {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl DedupGate {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Register a key. Returns `true` if the key is fresh (caller should
    /// enqueue), `false` if an identical key is still within the TTL.
    pub fn check_and_register(&self, key: u64) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("dedup gate poisoned");

        Self::evict(&mut inner, now, self.ttl, self.capacity);

        match inner.entries.get(&key) {
            Some(&registered) if now.duration_since(registered) < self.ttl => false,
            _ => {
                inner.entries.insert(key, now);
                inner.order.push_back((key, now));
                Self::evict(&mut inner, now, self.ttl, self.capacity);
                true
            }
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("dedup gate poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(inner: &mut Inner, now: Instant, ttl: Duration, capacity: usize) {
        // Expired entries first, then oldest-first down to the size cap.
        loop {
            let Some(&(key, registered)) = inner.order.front() else {
                break;
            };
            let expired = now.duration_since(registered) >= ttl;
            let over_capacity = inner.entries.len() > capacity;
            if !expired && !over_capacity {
                break;
            }
            inner.order.pop_front();
            // The same key may have been re-registered with a newer instant;
            // only drop the map entry if it still matches this record.
            if inner.entries.get(&key) == Some(&registered) {
                inner.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(ttl_secs: u64, capacity: usize) -> DedupGate {
        DedupGate::new(Duration::from_secs(ttl_secs), capacity)
    }

    fn key(n: u64) -> u64 {
        dedup_key(
            &AccountId("a1".into()),
            &ChatId("c1".into()),
            &MessageId(format!("m{n}")),
            ActionKind::SendText,
            "payload",
        )
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_within_ttl_is_suppressed() {
        let gate = gate(600, 64);
        let k = key(1);
        assert!(gate.check_and_register(k));
        assert!(!gate.check_and_register(k));
    }

    #[tokio::test(start_paused = true)]
    async fn key_expires_after_ttl() {
        let gate = gate(600, 64);
        let k = key(1);
        assert!(gate.check_and_register(k));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(gate.check_and_register(k));
    }

    #[tokio::test(start_paused = true)]
    async fn size_cap_enforced_on_insert() {
        let gate = gate(600, 4);
        for n in 0..32 {
            gate.check_and_register(key(n));
            assert!(gate.len() <= 4, "gate grew past capacity");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn oldest_key_evicted_when_full() {
        let gate = gate(600, 2);
        let first = key(1);
        assert!(gate.check_and_register(first));
        gate.check_and_register(key(2));
        gate.check_and_register(key(3));

        // The first key aged out of the cap, so it registers as fresh again.
        assert!(gate.check_and_register(first));
    }

    #[test]
    fn key_components_all_distinguish() {
        let base = dedup_key(
            &AccountId("a1".into()),
            &ChatId("c1".into()),
            &MessageId("m1".into()),
            ActionKind::SendText,
            "hi",
        );
        let other_account = dedup_key(
            &AccountId("a2".into()),
            &ChatId("c1".into()),
            &MessageId("m1".into()),
            ActionKind::SendText,
            "hi",
        );
        let other_kind = dedup_key(
            &AccountId("a1".into()),
            &ChatId("c1".into()),
            &MessageId("m1".into()),
            ActionKind::MarkRead,
            "hi",
        );
        let other_payload = dedup_key(
            &AccountId("a1".into()),
            &ChatId("c1".into()),
            &MessageId("m1".into()),
            ActionKind::SendText,
            "hello",
        );
        assert_ne!(base, other_account);
        assert_ne!(base, other_kind);
        assert_ne!(base, other_payload);
    }
}
