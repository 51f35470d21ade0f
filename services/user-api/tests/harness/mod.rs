// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for rate limiter flood simulation.
//!
//! Generators, attack patterns and outcome metrics used to check that the
//! limiter holds its bound under hostile traffic.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;
