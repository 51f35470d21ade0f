// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User records and list query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account status. Soft-deleted users are `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw create/update body. Every field is optional here; presence rules
/// live in the validator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
}

impl UserInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.phone.is_none()
            && self.status.is_none()
    }

    /// Names of the fields present in the body.
    pub fn present_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("email", self.email.is_some()),
            ("password", self.password.is_some()),
            ("phone", self.phone.is_some()),
            ("status", self.status.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

/// Validated data for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub status: UserStatus,
}

/// Validated changes for an existing user.
///
/// Name, email and phone are replaced; password and status only when given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub status: Option<UserStatus>,
}

/// Hard delete removes the row; soft delete marks the user inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Soft,
    Hard,
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Id,
    Name,
    Email,
    Status,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl OrderBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "status" => Some(Self::Status),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDir {
    Asc,
    #[default]
    Desc,
}

/// Raw list query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

/// Normalised list filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilters {
    pub limit: u64,
    pub offset: u64,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
    pub order_by: OrderBy,
    pub order_dir: OrderDir,
}

impl Default for UserFilters {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            status: None,
            search: None,
            order_by: OrderBy::default(),
            order_dir: OrderDir::default(),
        }
    }
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub created_today: u64,
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
    pub current_page: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn build(total: u64, count: u64, limit: u64, offset: u64) -> Self {
        let limit = limit.max(1);
        Self {
            total,
            count,
            limit,
            offset,
            has_more: offset + limit < total,
            current_page: offset / limit + 1,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_first_page() {
        let p = Pagination::build(25, 10, 10, 0);
        assert!(p.has_more);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn test_pagination_last_page() {
        let p = Pagination::build(25, 5, 10, 20);
        assert!(!p.has_more);
        assert_eq!(p.current_page, 3);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Pagination::build(0, 0, 10, 0);
        assert!(!p.has_more);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn test_status_round_trip_through_str() {
        assert_eq!(UserStatus::parse("active"), Some(UserStatus::Active));
        assert_eq!(UserStatus::parse("Active"), None);
        assert_eq!(UserStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_present_fields() {
        let input = UserInput {
            name: Some("Ana".into()),
            status: Some("active".into()),
            ..Default::default()
        };
        assert_eq!(input.present_fields(), vec!["name", "status"]);
        assert!(!input.is_empty());
        assert!(UserInput::default().is_empty());
    }
}
