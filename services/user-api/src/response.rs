// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Uniform JSON envelope for every API response.

use crate::limiter::RateLimitInfo;
use crate::models::Pagination;
use crate::validator::FieldErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    #[serde(skip)]
    code: StatusCode,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<&'static str>>,
    pub timestamp: String,
}

impl ApiResponse {
    fn base(code: StatusCode, status: &'static str) -> Self {
        Self {
            code,
            status,
            message: None,
            data: None,
            pagination: None,
            errors: None,
            rate_limit: None,
            allowed_methods: None,
            timestamp: now_timestamp(),
        }
    }

    /// 200 with a data payload.
    pub fn success(data: impl Serialize) -> Self {
        Self::base(StatusCode::OK, "success").with_data(data)
    }

    /// 200 carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::base(StatusCode::OK, "success").with_message(message)
    }

    /// 200 with data and a pagination block.
    pub fn paginated(data: impl Serialize, pagination: Pagination) -> Self {
        let mut response = Self::success(data);
        response.pagination = Some(pagination);
        response
    }

    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self::base(code, "error").with_message(message)
    }

    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: impl Serialize) -> Self {
        // Models always serialise; a failure degrades to `null`.
        self.data = Some(serde_json::to_value(data).unwrap_or(Value::Null));
        self
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    pub fn with_allowed_methods(mut self, methods: &[&'static str]) -> Self {
        self.allowed_methods = Some(methods.to_vec());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

/// Current UTC time in the envelope's timestamp format.
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("message").is_none());
        assert!(json.get("errors").is_none());
        assert_eq!(json["timestamp"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_error_envelope_shape() {
        let response = ApiResponse::error(StatusCode::METHOD_NOT_ALLOWED, "nope")
            .with_allowed_methods(&["GET", "POST"]);
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "nope");
        assert_eq!(json["allowed_methods"], serde_json::json!(["GET", "POST"]));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_paginated_envelope() {
        let response = ApiResponse::paginated(Vec::<u8>::new(), Pagination::build(0, 0, 10, 0));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pagination"]["total_pages"], 0);
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
