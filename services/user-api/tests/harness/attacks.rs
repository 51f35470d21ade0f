// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Flood patterns for rate limiter simulation.
//!
//! Time is virtual: the simulation drives a manual clock forward by
//! `spacing_secs` between requests, so hour-long windows run instantly.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of distinct clients, used round-robin
    pub unique_clients: usize,
    /// Virtual seconds between consecutive requests
    pub spacing_secs: u64,
    /// Limiter maximum per window
    pub max_requests: u32,
    /// Limiter window length in seconds
    pub window_secs: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_clients: 1,
            spacing_secs: 0,
            max_requests: 10,
            window_secs: 60,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// One client, every request in the same second.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 200,
            unique_clients: 1,
            ..Default::default()
        }
    }

    /// Many clients, each under the limit.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 500,
            unique_clients: 100,
            ..Default::default()
        }
    }

    /// One client pacing itself at exactly the sustainable rate.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            unique_clients: 1,
            spacing_secs: 6,
            ..Default::default()
        }
    }

    /// One client at twice the sustainable rate across several windows.
    pub fn sustained_pressure() -> Self {
        Self {
            total_requests: 120,
            unique_clients: 1,
            spacing_secs: 3,
            ..Default::default()
        }
    }

    /// Virtual duration of the attack in seconds.
    pub fn virtual_duration(&self) -> u64 {
        self.spacing_secs * self.total_requests.saturating_sub(1) as u64
    }

    /// Upper bound on admitted requests for a single client.
    pub fn max_admitted_per_client(&self) -> usize {
        let windows = self.virtual_duration() / self.window_secs + 1;
        windows as usize * self.max_requests as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_drip_is_sustainable() {
        let config = AttackConfig::slow_drip();
        assert_eq!(
            config.spacing_secs * u64::from(config.max_requests),
            config.window_secs
        );
    }

    #[test]
    fn test_flood_bound_is_one_window() {
        let config = AttackConfig::single_client_flood();
        assert_eq!(config.virtual_duration(), 0);
        assert_eq!(config.max_admitted_per_client(), 10);
    }
}
