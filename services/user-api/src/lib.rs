// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User API
//!
//! A JSON CRUD service for user records behind a per-client sliding-window
//! rate limiter:
//!
//! - Sliding-window limiting keyed by a BLAKE3 hash of the client identifier
//! - Memory or file-backed window storage with fail-open/fail-closed policy
//! - Input sanitisation and validation with per-field error reporting
//! - Soft and hard deletion with audit logging
//! - Prometheus metrics

pub mod app;
pub mod audit;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod password;
pub mod response;
pub mod store;
pub mod validator;

pub use config::Config;
pub use limiter::{RateLimitInfo, RateLimitPolicy, RateLimitResult, RateLimiter};
pub use store::{FileStore, MemoryStore, WindowStore};
