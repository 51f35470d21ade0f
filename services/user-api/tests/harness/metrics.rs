// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use std::collections::HashMap;
use std::time::Duration;

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Virtual admission times by client
    admitted: HashMap<String, Vec<u64>>,
    /// Count of requests by client
    requests_per_client: HashMap<String, usize>,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    Error,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome at virtual time `at`.
    pub fn record(&mut self, outcome: Outcome, client: &str, at: u64, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .requests_per_client
            .entry(client.to_string())
            .or_insert(0) += 1;
        if outcome == Outcome::Allowed {
            self.admitted.entry(client.to_string()).or_default().push(at);
        }
        self.latencies.push(latency.as_micros() as u64);
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of non-admitted requests to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(Outcome::Allowed)) as f64 / total as f64
    }

    /// Largest number of admissions any client got inside any span of
    /// `window_secs` (half-open, matching the limiter's expiry rule).
    pub fn max_admitted_in_window(&self, window_secs: u64) -> usize {
        self.admitted
            .values()
            .map(|times| {
                times
                    .iter()
                    .map(|&start| {
                        times
                            .iter()
                            .filter(|&&t| t >= start && t - start < window_secs)
                            .count()
                    })
                    .max()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    }

    /// Most admissions granted to a single client overall.
    pub fn max_admitted_per_client(&self) -> usize {
        self.admitted.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            errors: self.count(Outcome::Error),
            block_rate: self.block_rate(),
            median_latency_us: self.median_latency_us(),
            unique_clients: self.requests_per_client.len(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub errors: usize,
    pub block_rate: f64,
    pub median_latency_us: u64,
    pub unique_clients: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Errors:            {}", self.errors)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Median Latency:    {} us", self.median_latency_us)?;
        writeln!(f, "Unique Clients:    {}", self.unique_clients)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1", 0, Duration::from_micros(100));
        metrics.record(Outcome::Allowed, "10.0.0.1", 5, Duration::from_micros(150));
        metrics.record(Outcome::RateLimited, "10.0.0.1", 6, Duration::from_micros(50));

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.report().unique_clients, 1);
        assert!((metrics.block_rate() - 1.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_window_span_is_half_open() {
        let mut metrics = AttackMetrics::new();
        for at in [0, 30, 60, 61] {
            metrics.record(Outcome::Allowed, "c", at, Duration::ZERO);
        }

        // [0, 60) holds 0 and 30; [30, 90) holds 30, 60 and 61
        assert_eq!(metrics.max_admitted_in_window(60), 3);
        assert_eq!(metrics.max_admitted_per_client(), 4);
    }
}
