// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics exposed on the configured metrics path.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Service metrics, held in a registry owned by the application state.
pub struct Metrics {
    registry: Registry,
    /// Requests served, by method and status code
    pub http_requests: IntCounterVec,
    /// Request latency, by method
    pub http_latency: HistogramVec,
    /// Rate limiter outcomes: `admitted`, `rejected` or `error`
    pub rate_limit_decisions: IntCounterVec,
    storage_errors: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("user_api".to_string()), None)?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests served"),
            &["method", "status"],
        )?;
        let http_latency = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["method"],
        )?;
        let rate_limit_decisions = IntCounterVec::new(
            Opts::new("rate_limit_decisions_total", "Rate limiter decisions"),
            &["outcome"],
        )?;
        let storage_errors = IntGauge::new(
            "rate_limit_storage_errors",
            "Rate limit storage failures since start",
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;
        registry.register(Box::new(rate_limit_decisions.clone()))?;
        registry.register(Box::new(storage_errors.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_latency,
            rate_limit_decisions,
            storage_errors,
        })
    }

    pub fn record_decision(&self, outcome: &str) {
        self.rate_limit_decisions.with_label_values(&[outcome]).inc();
    }

    /// Text exposition of every registered metric.
    pub fn render(&self, storage_errors: u64) -> Result<String, prometheus::Error> {
        self.storage_errors
            .set(i64::try_from(storage_errors).unwrap_or(i64::MAX));

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Content type of [`Metrics::render`] output.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
