// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client rate limiter.
//!
//! Every identifier owns a window of request timestamps persisted in a
//! [`WindowStore`]. On each access the window is pruned to the entries
//! younger than `time_window` seconds; a request is admitted while fewer
//! than `max_requests` entries remain.
//!
//! The load/prune/append/save cycle for one identifier runs under an async
//! mutex keyed by the storage key, so concurrent requests from the same
//! client can never be admitted past the limit.

use crate::clock::{Clock, SystemClock};
use crate::config::FailurePolicy;
use crate::store::{storage_key, StoreError, WindowStore};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter failure.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("invalid rate limit argument: {0}")]
    InvalidArgument(&'static str),

    #[error("rate limit storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

/// Maximum requests per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window_secs: u64) -> Result<Self, RateLimitError> {
        validate_arguments(max_requests, window_secs)?;
        Ok(Self {
            max_requests,
            window_secs,
        })
    }
}

/// Limit metadata reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Configured maximum per window
    pub limit: u32,
    /// Slots left in the current window
    pub remaining: u32,
    /// Unix time at which the oldest counted request expires
    pub reset: u64,
    /// Seconds until `reset`
    pub reset_in: u64,
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request admitted; info reflects the state after admission
    Allowed(RateLimitInfo),
    /// Request rejected; no slot was consumed
    Limited(RateLimitInfo),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    pub fn info(&self) -> &RateLimitInfo {
        match self {
            Self::Allowed(info) | Self::Limited(info) => info,
        }
    }
}

/// Thread-safe rate limiter over an injected store.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    failure_policy: FailurePolicy,
    locks: DashMap<String, Arc<Mutex<()>>>,
    storage_errors: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter using the system clock.
    pub fn new(store: Arc<dyn WindowStore>, failure_policy: FailurePolicy) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), failure_policy)
    }

    pub fn with_clock(
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            store,
            clock,
            failure_policy,
            locks: DashMap::new(),
            storage_errors: AtomicU64::new(0),
        }
    }

    /// Record a request for `identifier` if it fits in the window.
    ///
    /// Returns `true` when admitted. A rejected request leaves the stored
    /// window unchanged apart from pruning.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u32,
        time_window: u64,
    ) -> Result<bool, RateLimitError> {
        let policy = RateLimitPolicy::new(max_requests, time_window)?;
        Ok(self.check_with_info(identifier, policy).await?.is_allowed())
    }

    /// Report the current limit state without recording a request.
    pub async fn get_rate_limit_info(
        &self,
        identifier: &str,
        max_requests: u32,
        time_window: u64,
    ) -> Result<RateLimitInfo, RateLimitError> {
        validate_arguments(max_requests, time_window)?;

        let key = storage_key(identifier);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let window = prune(self.load_window(&key).await?, now, time_window);
        Ok(window_info(&window, max_requests, time_window, now))
    }

    /// Check and, when admitted, record a request; the returned info is
    /// computed from the same window under the same lock.
    pub async fn check_with_info(
        &self,
        identifier: &str,
        policy: RateLimitPolicy,
    ) -> Result<RateLimitResult, RateLimitError> {
        let RateLimitPolicy {
            max_requests,
            window_secs,
        } = policy;
        validate_arguments(max_requests, window_secs)?;

        let key = storage_key(identifier);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let mut window = prune(self.load_window(&key).await?, now, window_secs);

        if window.len() >= max_requests as usize {
            self.save_window(&key, &window).await?;
            let info = window_info(&window, max_requests, window_secs, now);
            debug!(
                key = %key,
                reset_in = info.reset_in,
                "Rate limit exceeded"
            );
            return Ok(RateLimitResult::Limited(info));
        }

        window.push(now);
        self.save_window(&key, &window).await?;
        let info = window_info(&window, max_requests, window_secs, now);
        debug!(key = %key, remaining = info.remaining, "Request admitted");
        Ok(RateLimitResult::Allowed(info))
    }

    /// Drop lock entries no request is currently holding.
    pub fn cleanup(&self) {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        debug!(removed = before.saturating_sub(self.locks.len()), "Rate limiter locks pruned");
    }

    /// Number of identifier locks currently tracked.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Storage failures seen since start.
    pub fn storage_errors(&self) -> u64 {
        self.storage_errors.load(Ordering::Relaxed)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }

    async fn load_window(&self, key: &str) -> Result<Vec<u64>, RateLimitError> {
        match self.store.load(key).await {
            Ok(window) => Ok(window),
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                match self.failure_policy {
                    FailurePolicy::FailOpen => {
                        warn!(key, error = %e, "Rate window unreadable, treating as empty");
                        Ok(Vec::new())
                    }
                    FailurePolicy::FailClosed => {
                        warn!(key, error = %e, "Rate window unreadable, rejecting");
                        Err(e.into())
                    }
                }
            }
        }
    }

    async fn save_window(&self, key: &str, window: &[u64]) -> Result<(), RateLimitError> {
        match self.store.save(key, window).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                match self.failure_policy {
                    FailurePolicy::FailOpen => {
                        warn!(key, error = %e, "Rate window not persisted");
                        Ok(())
                    }
                    FailurePolicy::FailClosed => Err(e.into()),
                }
            }
        }
    }
}

fn validate_arguments(max_requests: u32, time_window: u64) -> Result<(), RateLimitError> {
    if max_requests == 0 {
        return Err(RateLimitError::InvalidArgument("max_requests must be positive"));
    }
    if time_window == 0 {
        return Err(RateLimitError::InvalidArgument("time_window must be positive"));
    }
    Ok(())
}

/// Keep only timestamps strictly younger than `time_window` seconds.
fn prune(mut timestamps: Vec<u64>, now: u64, time_window: u64) -> Vec<u64> {
    timestamps.retain(|&ts| now.saturating_sub(ts) < time_window);
    timestamps
}

fn window_info(window: &[u64], max_requests: u32, time_window: u64, now: u64) -> RateLimitInfo {
    let count = u32::try_from(window.len()).unwrap_or(u32::MAX);
    let reset = window
        .iter()
        .min()
        .map_or(now.saturating_add(time_window), |oldest| {
            oldest.saturating_add(time_window)
        });

    RateLimitInfo {
        limit: max_requests,
        remaining: max_requests.saturating_sub(count),
        reset,
        reset_in: reset.saturating_sub(now),
    }
}
