// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Audit and error logging.
//!
//! Audit records go to the `audit` tracing target and handler failures to
//! `api_error`, so a subscriber can route them separately from request logs.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions},
};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use tracing::{error, info};

/// Identifier used when the peer address is not known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Audited user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UserCreated,
    UserUpdated,
    UserSoftDeleted,
    UserHardDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserCreated => "USER_CREATED",
            Self::UserUpdated => "USER_UPDATED",
            Self::UserSoftDeleted => "USER_SOFT_DELETED",
            Self::UserHardDeleted => "USER_HARD_DELETED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request metadata attached to audit and error records.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
    pub method: String,
    pub uri: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            ip: client_ip(&parts.extensions),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
        })
    }
}

/// Peer IP from `ConnectInfo`, or [`UNKNOWN_CLIENT`] when the server was
/// not started with connect info.
pub fn client_ip(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Record an audited action.
pub fn log_activity(client: &ClientInfo, action: AuditAction, data: Value) {
    info!(
        target: "audit",
        action = %action,
        ip = %client.ip,
        method = %client.method,
        uri = %client.uri,
        user_agent = client.user_agent.as_deref().unwrap_or(""),
        data = %data,
        "User activity"
    );
}

/// Record a failed request.
pub fn log_error(client: &ClientInfo, message: &str, detail: &dyn fmt::Display) {
    error!(
        target: "api_error",
        ip = %client.ip,
        method = %client.method,
        uri = %client.uri,
        user_agent = client.user_agent.as_deref().unwrap_or(""),
        error = %detail,
        "{message}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::UserCreated.as_str(), "USER_CREATED");
        assert_eq!(AuditAction::UserHardDeleted.to_string(), "USER_HARD_DELETED");
        assert_eq!(
            serde_json::to_value(AuditAction::UserSoftDeleted).unwrap(),
            "USER_SOFT_DELETED"
        );
    }

    #[tokio::test]
    async fn test_client_info_without_connect_info() {
        let (mut parts, _) = Request::builder()
            .method("POST")
            .uri("/api/users?x=1")
            .header("user-agent", "curl/8.0")
            .body(())
            .unwrap()
            .into_parts();

        let client = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client.ip, UNKNOWN_CLIENT);
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(client.method, "POST");
        assert_eq!(client.uri, "/api/users?x=1");
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut extensions = Extensions::new();
        let addr: SocketAddr = "203.0.113.9:5555".parse().unwrap();
        extensions.insert(ConnectInfo(addr));
        assert_eq!(client_ip(&extensions), "203.0.113.9");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_activity_record_carries_request_line() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();

        let client = ClientInfo {
            ip: "203.0.113.9".to_string(),
            user_agent: Some("curl/8.0".to_string()),
            method: "DELETE".to_string(),
            uri: "/api/users/7?hard=true".to_string(),
        };
        tracing::subscriber::with_default(subscriber, || {
            log_activity(
                &client,
                AuditAction::UserHardDeleted,
                serde_json::json!({ "user_id": 7 }),
            );
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let record: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(record["target"], "audit");
        assert_eq!(record["fields"]["action"], "USER_HARD_DELETED");
        assert_eq!(record["fields"]["ip"], "203.0.113.9");
        assert_eq!(record["fields"]["method"], "DELETE");
        assert_eq!(record["fields"]["uri"], "/api/users/7?hard=true");
    }
}
