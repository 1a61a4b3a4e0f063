//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-session, per-operation token-bucket rate limiting.
//!
//! Each (session, operation) pair owns an independent bucket. A denied
//! operation is not applied; the caller surfaces a retry hint. Buckets are
//! cleared on world reload so stale sessions cannot pin memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Operations with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Login/create attempts.
    Auth,
    /// Chat and command traffic.
    Message,
    /// NPC plan generation (shared budget across the tick).
    NpcPlanning,
}

impl Operation {
    /// (capacity, refill per second) for each operation class.
    fn budget(self) -> (f64, f64) {
        match self {
            Operation::Auth => (5.0, 0.2),
            Operation::Message => (10.0, 1.0),
            Operation::NpcPlanning => (30.0, 0.5),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::Auth => "authentication",
            Operation::Message => "messages",
            Operation::NpcPlanning => "NPC planning",
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn consume(&mut self, tokens: f64, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= tokens {
            self.tokens -= tokens;
            true
        } else {
            false
        }
    }

    /// Seconds until one token is available.
    fn retry_after(&self) -> f64 {
        if self.refill_rate <= 0.0 {
            return f64::INFINITY;
        }
        ((1.0 - self.tokens).max(0.0)) / self.refill_rate
    }
}

/// Rate limiter shared across all sessions. Disabled limiters allow
/// everything.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    buckets: Mutex<HashMap<(String, Operation), TokenBucket>>,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `(sid, op)`. On exhaustion returns a retry-hint
    /// message and the operation is not applied.
    pub fn check_and_consume(&self, sid: &str, op: Operation) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let (capacity, refill) = op.budget();
        let bucket = buckets
            .entry((sid.to_string(), op))
            .or_insert_with(|| TokenBucket::new(capacity, refill));
        let now = Instant::now();
        if bucket.consume(1.0, now) {
            Ok(())
        } else {
            let wait = bucket.retry_after().ceil() as u64;
            Err(format!(
                "You're sending {} too quickly. Try again in about {}s.",
                op.label(),
                wait.max(1)
            ))
        }
    }

    /// Drop all buckets for a disconnecting session.
    pub fn forget_session(&self, sid: &str) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.retain(|(s, _), _| s != sid);
    }

    /// Clear every bucket; invoked on world reload.
    pub fn reset_all(&self) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let count = buckets.len();
        buckets.clear();
        if count > 0 {
            tracing::debug!("Cleared {} rate-limit buckets", count);
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_limiter_always_allows() {
        let limiter = RateLimiter::new(false);
        for _ in 0..1000 {
            assert!(limiter.check_and_consume("sid", Operation::Auth).is_ok());
        }
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn test_bucket_exhaustion() {
        let limiter = RateLimiter::new(true);
        for _ in 0..5 {
            assert!(limiter.check_and_consume("sid", Operation::Auth).is_ok());
        }
        let err = limiter
            .check_and_consume("sid", Operation::Auth)
            .unwrap_err();
        assert!(err.contains("Try again"), "retry hint missing: {}", err);
    }

    #[test]
    fn test_buckets_are_per_session() {
        let limiter = RateLimiter::new(true);
        for _ in 0..5 {
            limiter.check_and_consume("a", Operation::Auth).unwrap();
        }
        assert!(limiter.check_and_consume("a", Operation::Auth).is_err());
        assert!(limiter.check_and_consume("b", Operation::Auth).is_ok());
    }

    #[test]
    fn test_buckets_are_per_operation() {
        let limiter = RateLimiter::new(true);
        for _ in 0..5 {
            limiter.check_and_consume("a", Operation::Auth).unwrap();
        }
        assert!(limiter.check_and_consume("a", Operation::Auth).is_err());
        assert!(limiter.check_and_consume("a", Operation::Message).is_ok());
    }

    #[test]
    fn test_reset_all_clears() {
        let limiter = RateLimiter::new(true);
        limiter.check_and_consume("a", Operation::Message).unwrap();
        limiter.check_and_consume("b", Operation::Message).unwrap();
        assert_eq!(limiter.bucket_count(), 2);
        limiter.reset_all();
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn test_forget_session() {
        let limiter = RateLimiter::new(true);
        limiter.check_and_consume("a", Operation::Message).unwrap();
        limiter.check_and_consume("b", Operation::Message).unwrap();
        limiter.forget_session("a");
        assert_eq!(limiter.bucket_count(), 1);
    }
}
