// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the user API service.
//!
//! Values come from an optional config file and `USER_API_*` environment
//! variables (nested sections joined with `__`, e.g.
//! `USER_API_RATE_LIMIT__MAX_REQUESTS=50`). Every field has a default, so an
//! empty environment yields a working development setup.

use crate::limiter::{RateLimitError, RateLimitPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "USER_API";

/// Configuration for the user API service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deployment environment (default: development)
    #[serde(default)]
    pub environment: Environment,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Where rate windows are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process map; state is lost on restart
    Memory,
    /// One JSON file per client under `storage_dir`
    #[default]
    File,
}

/// What the limiter does when its storage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat unreadable history as empty and keep serving
    #[default]
    FailOpen,
    /// Surface the storage error to the caller
    FailClosed,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Apply the limiter to API routes (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum requests per window per client (default: 100)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Storage backend (default: file)
    #[serde(default)]
    pub storage: StorageBackend,

    /// Directory for the file backend (default: cache)
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Behaviour on storage failure (default: fail_open)
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Interval between idle lock sweeps in seconds (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed in production; development allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    3600
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8080".to_string(),
        "http://localhost:8081".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: Environment::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            storage: StorageBackend::default(),
            storage_dir: default_storage_dir(),
            failure_policy: FailurePolicy::default(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load from an optional file, then `USER_API_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl RateLimitConfig {
    /// Validated limiter policy.
    pub fn policy(&self) -> Result<RateLimitPolicy, RateLimitError> {
        RateLimitPolicy::new(self.max_requests, self.window_secs)
    }

    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the lock sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}
