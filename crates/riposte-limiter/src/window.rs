// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding window of send timestamps.
//!
//! Uses `tokio::time::Instant` so the paused test clock drives window math.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Time-ordered record of recent send instants for one scope.
#[derive(Debug, Default)]
pub struct SlidingWindow {
    events: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send at `now`. Instants must be recorded in non-decreasing
    /// order; the queue stays sorted by construction.
    pub fn record(&mut self, now: Instant) {
        self.events.push_back(now);
    }

    /// Number of sends within the trailing `window` ending at `now`.
    pub fn count_within(&self, now: Instant, window: Duration) -> usize {
        let cutoff = now.checked_sub(window);
        match cutoff {
            Some(cutoff) => self
                .events
                .iter()
                .rev()
                .take_while(|&&t| t > cutoff)
                .count(),
            // The window reaches past the clock's origin: everything counts.
            None => self.events.len(),
        }
    }

    /// Drop events older than `retention` before `now`. Returns how many
    /// were removed.
    pub fn prune(&mut self, now: Instant, retention: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(retention) else {
            return 0;
        };
        let before = self.events.len();
        while matches!(self.events.front(), Some(&t) if t <= cutoff) {
            self.events.pop_front();
        }
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
