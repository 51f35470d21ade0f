// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Application assembly: state construction and the router.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Environment, StorageBackend};
use crate::db::{MemoryDatabase, UserRepository};
use crate::handlers::{
    collection_method_not_allowed, create_user, delete_user, get_user, health,
    item_method_not_allowed, list_users, metrics_handler, not_found, update_user, AppState,
};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::middleware::{rate_limit, track_requests};
use crate::store::{FileStore, MemoryStore, WindowStore};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Build application state from configuration, opening the configured
/// window store.
///
/// Fails on an invalid rate limit policy or an unusable storage directory.
pub async fn build_state(
    config: Config,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<AppState>> {
    let store: Arc<dyn WindowStore> = match config.rate_limit.storage {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            Arc::new(FileStore::open(config.rate_limit.storage_dir.clone()).await?)
        }
    };
    assemble(config, store, users, clock)
}

/// Build application state around an explicit window store.
pub fn assemble(
    config: Config,
    store: Arc<dyn WindowStore>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<AppState>> {
    let policy = config.rate_limit.policy()?;
    let metrics_path = &config.metrics.path;
    anyhow::ensure!(
        metrics_path.starts_with('/')
            && !metrics_path.starts_with("/api")
            && metrics_path != "/healthz",
        "invalid metrics path: {metrics_path}"
    );

    let limiter = RateLimiter::with_clock(store, clock, config.rate_limit.failure_policy);

    Ok(Arc::new(AppState {
        config,
        policy,
        limiter,
        users,
        metrics: Metrics::new()?,
    }))
}

/// State backed by an in-memory user table and the system clock.
pub async fn default_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    build_state(config, Arc::new(MemoryDatabase::new()), Arc::new(SystemClock)).await
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut api = Router::new()
        .route("/api/health", get(health))
        .route("/healthz", get(health))
        .route(
            "/api/users",
            get(list_users)
                .post(create_user)
                .fallback(collection_method_not_allowed),
        )
        .route(
            "/api/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(item_method_not_allowed),
        );

    if state.config.rate_limit.enabled {
        api = api.route_layer(from_fn_with_state(state.clone(), rate_limit));
    } else {
        warn!("Rate limiting disabled");
    }

    if state.config.metrics.enabled {
        api = api.route(&state.config.metrics.path, get(metrics_handler));
    }

    // CORS wraps the routes, so preflight never reaches the limiter.
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(from_fn_with_state(state.clone(), track_requests));

    api.fallback(not_found).layer(layers).with_state(state)
}

/// CORS policy: any origin in development, the configured list in production.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.environment {
        // Mirroring keeps credentials legal; a literal `*` would not.
        Environment::Development => AllowOrigin::mirror_request(),
        Environment::Production => {
            let origins: Vec<HeaderValue> = config
                .cors
                .allowed_origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            info!(count = origins.len(), "CORS restricted to configured origins");
            AllowOrigin::list(origins)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}
