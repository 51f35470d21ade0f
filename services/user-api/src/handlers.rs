// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the user API.

use crate::audit::{self, AuditAction, ClientInfo};
use crate::config::Config;
use crate::db::UserRepository;
use crate::error::{ApiError, Result};
use crate::limiter::{RateLimitPolicy, RateLimiter};
use crate::metrics::{self, Metrics};
use crate::models::{DeleteMode, ListQuery, Pagination, UserInput, UserStats};
use crate::response::{now_timestamp, ApiResponse};
use crate::validator::{parse_user_id, validate_filters, validate_new_user, validate_user_changes};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub const COLLECTION_METHODS: &[&str] = &["GET", "POST"];
pub const ITEM_METHODS: &[&str] = &["GET", "PUT", "DELETE"];

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub policy: RateLimitPolicy,
    pub limiter: RateLimiter,
    pub users: Arc<dyn UserRepository>,
    pub metrics: Metrics,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub database: DatabaseHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<UserStats>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    pub backend: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: Option<String>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let ping = state.users.ping().await;
    let statistics = match ping {
        Ok(()) => state.users.stats().await.ok(),
        Err(_) => None,
    };

    let (code, body) = match ping {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "success",
                message: "API is running",
                service: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
                environment: state.config.environment.as_str(),
                database: DatabaseHealth {
                    status: "connected",
                    backend: state.users.backend(),
                },
                statistics,
                timestamp: now_timestamp(),
            },
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "error",
                    message: "Database unavailable",
                    service: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    environment: state.config.environment.as_str(),
                    database: DatabaseHealth {
                        status: "disconnected",
                        backend: state.users.backend(),
                    },
                    statistics: None,
                    timestamp: now_timestamp(),
                },
            )
        }
    };

    (code, Json(body)).into_response()
}

/// `GET /api/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse> {
    let filters = validate_filters(&query);
    debug!(?filters, "Listing users");

    let users = state
        .users
        .list(&filters)
        .await
        .map_err(|e| report(&client, "Failed to list users", e))?;
    let total = state
        .users
        .count(&filters)
        .await
        .map_err(|e| report(&client, "Failed to count users", e))?;

    let pagination = Pagination::build(total, users.len() as u64, filters.limit, filters.offset);
    Ok(ApiResponse::paginated(users, pagination))
}

/// `GET /api/users/:id`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse> {
    let id = parse_user_id(&raw_id).ok_or(ApiError::InvalidId)?;

    let user = state
        .users
        .get(id)
        .await
        .map_err(|e| report(&client, "Failed to fetch user", e))?
        .ok_or(ApiError::UserNotFound)?;

    Ok(ApiResponse::success(user))
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    body: Bytes,
) -> Result<ApiResponse> {
    let input = parse_body(&body)?;
    let new_user = validate_new_user(&input).map_err(ApiError::Validation)?;

    let taken = state
        .users
        .email_exists(&new_user.email, None)
        .await
        .map_err(|e| report(&client, "Failed to create user", e))?;
    if taken {
        return Err(ApiError::EmailTaken);
    }

    let user = state
        .users
        .create(new_user)
        .await
        .map_err(|e| report(&client, "Failed to create user", e))?;

    audit::log_activity(
        &client,
        AuditAction::UserCreated,
        json!({ "user_id": user.id, "email": user.email }),
    );

    Ok(ApiResponse::success(user)
        .with_code(StatusCode::CREATED)
        .with_message("User created successfully"))
}

/// `PUT /api/users/:id`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse> {
    let id = parse_user_id(&raw_id).ok_or(ApiError::InvalidId)?;

    let exists = state
        .users
        .exists(id)
        .await
        .map_err(|e| report(&client, "Failed to update user", e))?;
    if !exists {
        return Err(ApiError::UserNotFound);
    }

    let input = parse_body(&body)?;
    let changes = validate_user_changes(&input).map_err(ApiError::Validation)?;

    let taken = state
        .users
        .email_exists(&changes.email, Some(id))
        .await
        .map_err(|e| report(&client, "Failed to update user", e))?;
    if taken {
        return Err(ApiError::EmailTaken);
    }

    let user = state
        .users
        .update(id, changes)
        .await
        .map_err(|e| report(&client, "Failed to update user", e))?;

    audit::log_activity(
        &client,
        AuditAction::UserUpdated,
        json!({ "user_id": id, "updated_fields": input.present_fields() }),
    );

    Ok(ApiResponse::success(user).with_message("User updated successfully"))
}

/// `DELETE /api/users/:id`; `?hard=true` removes the row.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Path(raw_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<ApiResponse> {
    let id = parse_user_id(&raw_id).ok_or(ApiError::InvalidId)?;

    let exists = state
        .users
        .exists(id)
        .await
        .map_err(|e| report(&client, "Failed to delete user", e))?;
    if !exists {
        return Err(ApiError::UserNotFound);
    }

    let mode = match query.hard.as_deref() {
        Some("true") => DeleteMode::Hard,
        _ => DeleteMode::Soft,
    };

    state
        .users
        .delete(id, mode)
        .await
        .map_err(|e| report(&client, "Failed to delete user", e))?;

    let (action, message) = match mode {
        DeleteMode::Hard => (AuditAction::UserHardDeleted, "User permanently deleted"),
        DeleteMode::Soft => (AuditAction::UserSoftDeleted, "User deactivated successfully"),
    };
    audit::log_activity(&client, action, json!({ "user_id": id }));

    Ok(ApiResponse::message(message))
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render(state.limiter.storage_errors()) {
        Ok(body) => ([(header::CONTENT_TYPE, metrics::content_type())], body).into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}

pub async fn collection_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed(COLLECTION_METHODS)
}

pub async fn item_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed(ITEM_METHODS)
}

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Decode a JSON body into raw user input. A blank body, or an object
/// carrying none of the user fields, counts as no data.
fn parse_body(body: &[u8]) -> Result<UserInput> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::EmptyBody);
    }

    let input: UserInput =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
    if input.is_empty() {
        return Err(ApiError::EmptyBody);
    }
    Ok(input)
}

/// Convert a repository failure, logging it when it is a server error.
fn report(client: &ClientInfo, context: &str, err: impl Into<ApiError>) -> ApiError {
    let err = err.into();
    if let ApiError::Internal(detail) = &err {
        audit::log_error(client, context, detail);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_blank_is_empty() {
        assert!(matches!(parse_body(b""), Err(ApiError::EmptyBody)));
        assert!(matches!(parse_body(b" \n\t"), Err(ApiError::EmptyBody)));
    }

    #[test]
    fn test_parse_body_without_user_fields_is_empty() {
        assert!(matches!(parse_body(b"{}"), Err(ApiError::EmptyBody)));
        assert!(matches!(
            parse_body(br#"{"nickname": "x"}"#),
            Err(ApiError::EmptyBody)
        ));
    }

    #[test]
    fn test_parse_body_malformed() {
        assert!(matches!(
            parse_body(b"{not json"),
            Err(ApiError::MalformedBody(_))
        ));
        assert!(matches!(
            parse_body(br#"{"name": 42}"#),
            Err(ApiError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_parse_body_reads_fields() {
        let input = parse_body(br#"{"name": "Ana", "email": "ana@example.com"}"#).unwrap();
        assert_eq!(input.name.as_deref(), Some("Ana"));
        assert_eq!(input.email.as_deref(), Some("ana@example.com"));
        assert!(input.password.is_none());
    }
}
