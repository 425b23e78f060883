// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission-control rate limiter for the Riposte pipeline.
//!
//! The task queue consults [`RateLimiter::check_limit`] before every dispatch
//! and reports actual traffic back through [`RateLimiter::record_send`], so
//! the sliding windows reflect what was really sent, not what was attempted.

pub mod limiter;
pub mod window;

pub use limiter::{
    account_scope_key, chat_scope_key, RateLimitOverrides, RateLimiter, GLOBAL_SCOPE,
};
pub use window::SlidingWindow;
