// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled text matchers and the shared regex cache.
//!
//! Each matcher kind gets its own enum variant, compiled once per rule.
//! Regex compilation is the dominant cost at scale, so compiled regexes are
//! shared through a bounded cache keyed by `(pattern, case_insensitive)`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};

use riposte_core::types::{MatcherKind, MatcherSpec};

type CacheKey = (String, bool);

/// Bounded cache of compiled regexes, keyed by `(pattern, case_insensitive)`.
///
/// Eviction is insertion-order FIFO: when the cache is full, the oldest
/// entry is dropped. Entries are `Arc`s, so an evicted regex stays alive for
/// any rule still holding it.
pub struct RegexCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    map: HashMap<CacheKey, Arc<Regex>>,
    order: VecDeque<CacheKey>,
}

impl RegexCache {
    /// Create a cache holding at most `capacity` compiled regexes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Fetch a compiled regex, compiling and caching on miss.
    pub fn get(&self, pattern: &str, case_insensitive: bool) -> Result<Arc<Regex>, regex::Error> {
        let key = (pattern.to_string(), case_insensitive);
        let mut inner = self.inner.lock().expect("regex cache poisoned");

        if let Some(regex) = inner.map.get(&key) {
            return Ok(Arc::clone(regex));
        }

        let regex = Arc::new(
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()?,
        );

        inner.map.insert(key.clone(), Arc::clone(&regex));
        inner.order.push_back(key);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }

        Ok(regex)
    }

    /// Number of cached regexes.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("regex cache poisoned").map.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A matcher compiled into its evaluable form.
#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    Exact { pattern: String, case_sensitive: bool },
    Contains { pattern: String, case_sensitive: bool },
    Prefix { pattern: String, case_sensitive: bool },
    Suffix { pattern: String, case_sensitive: bool },
    Regex { regex: Arc<Regex> },
}

impl CompiledMatcher {
    /// Compile a matcher spec, sharing regexes through the cache.
    pub fn compile(spec: &MatcherSpec, cache: &RegexCache) -> Result<Self, regex::Error> {
        let pattern = spec.pattern.clone();
        let case_sensitive = spec.case_sensitive;
        Ok(match spec.kind {
            MatcherKind::Exact => Self::Exact {
                pattern,
                case_sensitive,
            },
            MatcherKind::Contains => Self::Contains {
                pattern,
                case_sensitive,
            },
            MatcherKind::Prefix => Self::Prefix {
                pattern,
                case_sensitive,
            },
            MatcherKind::Suffix => Self::Suffix {
                pattern,
                case_sensitive,
            },
            MatcherKind::Regex => Self::Regex {
                regex: cache.get(&spec.pattern, !spec.case_sensitive)?,
            },
        })
    }

    /// Whether this matcher accepts the given text.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Exact {
                pattern,
                case_sensitive,
            } => fold(text, *case_sensitive) == fold(pattern, *case_sensitive),
            Self::Contains {
                pattern,
                case_sensitive,
            } => fold(text, *case_sensitive).contains(&fold(pattern, *case_sensitive)),
            Self::Prefix {
                pattern,
                case_sensitive,
            } => fold(text, *case_sensitive).starts_with(&fold(pattern, *case_sensitive)),
            Self::Suffix {
                pattern,
                case_sensitive,
            } => fold(text, *case_sensitive).ends_with(&fold(pattern, *case_sensitive)),
            Self::Regex { regex } => regex.is_match(text),
        }
    }
}

fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}
