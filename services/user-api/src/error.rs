// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the HTTP layer.

use crate::db::RepoError;
use crate::limiter::{RateLimitError, RateLimitInfo};
use crate::response::ApiResponse;
use crate::validator::FieldErrors;
use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Application error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid or missing ID")]
    InvalidId,

    #[error("No data provided")]
    EmptyBody,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Invalid data")]
    Validation(FieldErrors),

    #[error("User not found")]
    UserNotFound,

    #[error("Email already in use")]
    EmailTaken,

    #[error("Resource not found")]
    RouteNotFound,

    #[error("HTTP method not allowed")]
    MethodNotAllowed(&'static [&'static str]),

    #[error("Rate limit exceeded. Try again in {} seconds.", .0.reset_in)]
    RateLimited(RateLimitInfo),

    /// Detail is logged, never sent to the client
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidId | Self::EmptyBody | Self::MalformedBody(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UserNotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(_) => Self::UserNotFound,
            RepoError::DuplicateEmail(_) => Self::EmailTaken,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ApiResponse::error(self.status_code(), self.to_string());

        match self {
            Self::Validation(errors) => envelope.with_errors(errors).into_response(),
            Self::MethodNotAllowed(methods) => {
                envelope.with_allowed_methods(methods).into_response()
            }
            Self::RateLimited(info) => {
                let mut response = envelope.with_rate_limit(info).into_response();
                let headers = response.headers_mut();
                insert_rate_limit_headers(headers, &info);
                headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(info.reset_in));
                response
            }
            _ => envelope.into_response(),
        }
    }
}

/// Attach `X-RateLimit-*` headers.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(HeaderName::from_static(HEADER_LIMIT), HeaderValue::from(info.limit));
    headers.insert(
        HeaderName::from_static(HEADER_REMAINING),
        HeaderValue::from(info.remaining),
    );
    headers.insert(HeaderName::from_static(HEADER_RESET), HeaderValue::from(info.reset));
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
