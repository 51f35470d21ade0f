// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request middleware: per-client rate limiting and request metrics.

use crate::audit::client_ip;
use crate::error::{insert_rate_limit_headers, ApiError};
use crate::handlers::AppState;
use crate::limiter::RateLimitResult;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Admit or reject the request against the client's sliding window.
///
/// Admitted responses carry `X-RateLimit-*` headers; rejections short-circuit
/// with a 429 envelope.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.extensions());

    match state.limiter.check_with_info(&ip, state.policy).await {
        Ok(RateLimitResult::Allowed(info)) => {
            state.metrics.record_decision("admitted");
            debug!(ip = %ip, remaining = info.remaining, "Request admitted");
            let mut response = next.run(request).await;
            insert_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Ok(RateLimitResult::Limited(info)) => {
            state.metrics.record_decision("rejected");
            info!(
                ip = %ip,
                path = %request.uri().path(),
                reset_in = info.reset_in,
                "Request rate limited"
            );
            ApiError::RateLimited(info).into_response()
        }
        Err(e) => {
            state.metrics.record_decision("error");
            error!(ip = %ip, error = %e, "Rate limiter unavailable");
            ApiError::from(e).into_response()
        }
    }
}

/// Count and time every request.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    state
        .metrics
        .http_latency
        .with_label_values(&[method.as_str()])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .http_requests
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    response
}
