// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User input sanitisation and validation.
//!
//! Input is sanitised first (tags stripped, e-mail and phone reduced to
//! their allowed character sets) and the sanitised values are what gets
//! validated and stored. All field errors are collected so a client sees
//! every problem in one response.

use crate::models::{
    ListQuery, NewUser, OrderBy, OrderDir, UserChanges, UserFilters, UserInput, UserStatus,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 150;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 255;
const PHONE_MAX: usize = 20;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Validation error for a single field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("name must contain only letters and spaces")]
    InvalidName,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid phone format")]
    InvalidPhone,

    #[error("status must be \"active\" or \"inactive\"")]
    InvalidStatus,
}

impl ValidationError {
    /// Field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::TooShort { field, .. } | Self::TooLong { field, .. } => {
                *field
            }
            Self::InvalidName => "name",
            Self::InvalidEmail => "email",
            Self::InvalidPhone => "phone",
            Self::InvalidStatus => "status",
        }
    }
}

/// Field errors keyed by field name. Serialises as `{"field": "message"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, ValidationError>);

impl FieldErrors {
    /// Record an error; the first error per field wins.
    pub fn add(&mut self, error: ValidationError) {
        self.0.entry(error.field()).or_insert(error);
    }

    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            debug!(fields = ?self.0.keys().collect::<Vec<_>>(), "User input rejected");
            Err(self)
        }
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(field, err)| (*field, err.to_string())))
    }
}

/// Sanitise a raw body. The password is passed through untouched.
pub fn sanitize_user_input(input: &UserInput) -> UserInput {
    UserInput {
        name: input.name.as_deref().map(|n| strip_tags(n.trim()).trim().to_string()),
        email: input.email.as_deref().map(sanitize_email),
        password: input.password.clone(),
        phone: input.phone.as_deref().map(sanitize_phone),
        status: input.status.as_deref().map(|s| s.trim().to_string()),
    }
}

/// Validate a create request; the password is mandatory.
pub fn validate_new_user(input: &UserInput) -> Result<NewUser, FieldErrors> {
    let input = sanitize_user_input(input);
    let mut errors = FieldErrors::default();

    let name = check_name(input.name.as_deref(), &mut errors);
    let email = check_email(input.email.as_deref(), &mut errors);
    let password = match non_empty(input.password.as_deref()) {
        Some(p) => check_password(p, &mut errors),
        None => {
            errors.add(ValidationError::Required { field: "password" });
            String::new()
        }
    };
    let phone = check_phone(input.phone.as_deref(), &mut errors);
    let status = check_status(input.status.as_deref(), &mut errors);

    errors.into_result(NewUser {
        name,
        email,
        password,
        phone,
        status: status.unwrap_or(UserStatus::Active),
    })
}

/// Validate an update request; name and email are still required.
pub fn validate_user_changes(input: &UserInput) -> Result<UserChanges, FieldErrors> {
    let input = sanitize_user_input(input);
    let mut errors = FieldErrors::default();

    let name = check_name(input.name.as_deref(), &mut errors);
    let email = check_email(input.email.as_deref(), &mut errors);
    let password = non_empty(input.password.as_deref()).map(|p| check_password(p, &mut errors));
    let phone = check_phone(input.phone.as_deref(), &mut errors);
    let status = check_status(input.status.as_deref(), &mut errors);

    errors.into_result(UserChanges {
        name,
        email,
        password,
        phone,
        status,
    })
}

/// Normalise list query parameters. Never fails: bad values fall back to
/// their defaults.
pub fn validate_filters(query: &ListQuery) -> UserFilters {
    let limit = match parse_int(query.limit.as_deref()) {
        Some(n) if n > MAX_LIMIT as i64 => MAX_LIMIT,
        Some(n) if n >= 1 => n as u64,
        _ => DEFAULT_LIMIT,
    };

    let offset = match parse_int(query.offset.as_deref()) {
        Some(n) if n > 0 => n as u64,
        _ => 0,
    };

    let search = query
        .search
        .as_deref()
        .map(|s| strip_tags(s.trim()).trim().to_string())
        .filter(|s| !s.is_empty());

    let order_dir = match query.order_dir.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("ASC") => OrderDir::Asc,
        _ => OrderDir::Desc,
    };

    UserFilters {
        limit,
        offset,
        status: query.status.as_deref().and_then(UserStatus::parse),
        search,
        order_by: query
            .order_by
            .as_deref()
            .and_then(OrderBy::parse)
            .unwrap_or_default(),
        order_dir,
    }
}

/// Parse a path id; only positive integers are valid.
pub fn parse_user_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

fn check_name(name: Option<&str>, errors: &mut FieldErrors) -> String {
    let Some(name) = non_empty(name) else {
        errors.add(ValidationError::Required { field: "name" });
        return String::new();
    };

    let len = name.chars().count();
    if len < NAME_MIN {
        errors.add(ValidationError::TooShort {
            field: "name",
            min: NAME_MIN,
        });
    } else if len > NAME_MAX {
        errors.add(ValidationError::TooLong {
            field: "name",
            max: NAME_MAX,
        });
    } else if !name.chars().all(is_name_char) {
        errors.add(ValidationError::InvalidName);
    }
    name.to_string()
}

fn check_email(email: Option<&str>, errors: &mut FieldErrors) -> String {
    let Some(email) = non_empty(email) else {
        errors.add(ValidationError::Required { field: "email" });
        return String::new();
    };

    if !is_valid_email(email) {
        errors.add(ValidationError::InvalidEmail);
    } else if email.len() > EMAIL_MAX {
        errors.add(ValidationError::TooLong {
            field: "email",
            max: EMAIL_MAX,
        });
    }
    email.to_lowercase()
}

fn check_password(password: &str, errors: &mut FieldErrors) -> String {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        errors.add(ValidationError::TooShort {
            field: "password",
            min: PASSWORD_MIN,
        });
    } else if len > PASSWORD_MAX {
        errors.add(ValidationError::TooLong {
            field: "password",
            max: PASSWORD_MAX,
        });
    }
    password.to_string()
}

fn check_phone(phone: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let phone = non_empty(phone)?;

    if phone.chars().count() > PHONE_MAX {
        errors.add(ValidationError::TooLong {
            field: "phone",
            max: PHONE_MAX,
        });
    } else if !phone.chars().all(is_phone_char) {
        errors.add(ValidationError::InvalidPhone);
    }
    Some(phone.to_string())
}

fn check_status(status: Option<&str>, errors: &mut FieldErrors) -> Option<UserStatus> {
    let raw = non_empty(status)?;
    let parsed = UserStatus::parse(raw);
    if parsed.is_none() {
        errors.add(ValidationError::InvalidStatus);
    }
    parsed
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Letters (ASCII and Latin-1 supplement) and whitespace.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace() || ('\u{C0}'..='\u{FF}').contains(&c)
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '(' | ')' | '-' | '+')
}

fn is_email_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(c)
}

/// Remove anything between `<` and `>`, including an unterminated tag.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn sanitize_email(email: &str) -> String {
    email.trim().chars().filter(|c| is_email_char(*c)).collect()
}

fn sanitize_phone(phone: &str) -> String {
    let kept: String = phone.trim().chars().filter(|c| is_phone_char(*c)).collect();
    kept.trim().to_string()
}

/// Structural e-mail check: one `@`, a dot-atom local part and a dotted
/// host name of letters, digits and hyphens.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let local_ok = local
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| is_email_char(c) && !"@[]".contains(c)));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    local_ok && domain_ok
}
