// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User API Service
//!
//! JSON CRUD over user records with per-client sliding-window rate limiting.
//!
//! ## Configuration
//!
//! Settings come from an optional config file (`--config`) and environment
//! variables prefixed `USER_API_`, after `.env` is loaded:
//!
//! - `USER_API_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `USER_API_ENVIRONMENT`: `development` or `production`
//! - `USER_API_RATE_LIMIT__MAX_REQUESTS`: Requests per window (default: 100)
//! - `USER_API_RATE_LIMIT__WINDOW_SECS`: Window length in seconds (default: 3600)
//! - `USER_API_RATE_LIMIT__STORAGE`: `memory` or `file` (default: file)
//! - `USER_API_RATE_LIMIT__FAILURE_POLICY`: `fail_open` or `fail_closed`
//! - `USER_API_CORS__ALLOWED_ORIGINS`: Comma-separated production origins

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use user_api::{app, config::Config};

#[derive(Parser)]
#[command(name = "user-api", about = "User CRUD API with sliding-window rate limiting")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    info!(
        bind_addr = %config.bind_addr,
        environment = config.environment.as_str(),
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        storage = ?config.rate_limit.storage,
        failure_policy = ?config.rate_limit.failure_policy,
        "Starting user API"
    );

    let cleanup_interval = config.rate_limit.cleanup_interval();
    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = app::default_state(config).await?;

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup();
        }
    });

    let router = app::router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("User API stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
