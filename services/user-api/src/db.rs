// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User storage.
//!
//! Handlers talk to a [`UserRepository`]; [`MemoryDatabase`] is the
//! in-process implementation backing the service and the tests.

use crate::models::{
    DeleteMode, NewUser, OrderBy, OrderDir, User, UserChanges, UserFilters, UserStats, UserStatus,
};
use crate::password::{CredentialHasher, PasswordError};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("User not found: {0}")]
    NotFound(u64),

    #[error("Email already in use: {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, filters: &UserFilters) -> Result<Vec<User>, RepoError>;

    /// Number of users matching `filters`, ignoring limit and offset.
    async fn count(&self, filters: &UserFilters) -> Result<u64, RepoError>;

    async fn get(&self, id: u64) -> Result<Option<User>, RepoError>;

    async fn exists(&self, id: u64) -> Result<bool, RepoError>;

    async fn email_exists(&self, email: &str, exclude_id: Option<u64>) -> Result<bool, RepoError>;

    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn update(&self, id: u64, changes: UserChanges) -> Result<User, RepoError>;

    async fn delete(&self, id: u64, mode: DeleteMode) -> Result<(), RepoError>;

    async fn stats(&self) -> Result<UserStats, RepoError>;

    /// Connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), RepoError>;

    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Table {
    last_id: u64,
    rows: BTreeMap<u64, UserRow>,
}

impl Table {
    fn email_taken(&self, email: &str, exclude_id: Option<u64>) -> bool {
        self.rows
            .values()
            .any(|row| row.user.email == email && Some(row.user.id) != exclude_id)
    }

    fn matching<'a>(&'a self, filters: &'a UserFilters) -> impl Iterator<Item = &'a User> + 'a {
        let needle = filters.search.as_ref().map(|s| s.to_lowercase());
        self.rows.values().map(|row| &row.user).filter(move |user| {
            filters.status.map_or(true, |status| user.status == status)
                && needle.as_deref().map_or(true, |needle| {
                    user.name.to_lowercase().contains(needle)
                        || user.email.to_lowercase().contains(needle)
                })
        })
    }
}

/// In-memory user table.
pub struct MemoryDatabase {
    table: RwLock<Table>,
    hasher: Arc<CredentialHasher>,
    available: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::with_hasher(CredentialHasher::new())
    }

    pub fn with_hasher(hasher: CredentialHasher) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            hasher: Arc::new(hasher),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing or regaining the backend.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Unavailable("memory backend offline".to_string()))
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, RepoError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| RepoError::Unavailable(format!("hashing task failed: {}", e)))?
            .map_err(RepoError::from)
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn list(&self, filters: &UserFilters) -> Result<Vec<User>, RepoError> {
        self.ensure_available()?;
        let table = self.table.read().await;

        let mut users: Vec<User> = table.matching(filters).cloned().collect();
        users.sort_by(|a, b| {
            let ord = compare_users(a, b, filters.order_by);
            match filters.order_dir {
                OrderDir::Asc => ord,
                OrderDir::Desc => ord.reverse(),
            }
        });

        Ok(users
            .into_iter()
            .skip(filters.offset as usize)
            .take(filters.limit as usize)
            .collect())
    }

    async fn count(&self, filters: &UserFilters) -> Result<u64, RepoError> {
        self.ensure_available()?;
        let table = self.table.read().await;
        Ok(table.matching(filters).count() as u64)
    }

    async fn get(&self, id: u64) -> Result<Option<User>, RepoError> {
        self.ensure_available()?;
        let table = self.table.read().await;
        Ok(table.rows.get(&id).map(|row| row.user.clone()))
    }

    async fn exists(&self, id: u64) -> Result<bool, RepoError> {
        self.ensure_available()?;
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<u64>) -> Result<bool, RepoError> {
        self.ensure_available()?;
        let email = email.trim().to_lowercase();
        Ok(self.table.read().await.email_taken(&email, exclude_id))
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        self.ensure_available()?;
        let password_hash = self.hash_password(user.password).await?;

        let mut table = self.table.write().await;
        if table.email_taken(&user.email, None) {
            return Err(RepoError::DuplicateEmail(user.email));
        }

        table.last_id += 1;
        let now = Utc::now();
        let created = User {
            id: table.last_id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            status: user.status,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(
            created.id,
            UserRow {
                user: created.clone(),
                password_hash,
            },
        );

        debug!(id = created.id, "User row inserted");
        Ok(created)
    }

    async fn update(&self, id: u64, changes: UserChanges) -> Result<User, RepoError> {
        self.ensure_available()?;
        let password_hash = match changes.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let mut table = self.table.write().await;
        if table.email_taken(&changes.email, Some(id)) {
            return Err(RepoError::DuplicateEmail(changes.email));
        }

        let row = table.rows.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        row.user.name = changes.name;
        row.user.email = changes.email;
        row.user.phone = changes.phone;
        if let Some(status) = changes.status {
            row.user.status = status;
        }
        if let Some(hash) = password_hash {
            row.password_hash = hash;
        }
        row.user.updated_at = Utc::now();

        Ok(row.user.clone())
    }

    async fn delete(&self, id: u64, mode: DeleteMode) -> Result<(), RepoError> {
        self.ensure_available()?;
        let mut table = self.table.write().await;

        match mode {
            DeleteMode::Soft => {
                let row = table.rows.get_mut(&id).ok_or(RepoError::NotFound(id))?;
                row.user.status = UserStatus::Inactive;
                row.user.updated_at = Utc::now();
            }
            DeleteMode::Hard => {
                table.rows.remove(&id).ok_or(RepoError::NotFound(id))?;
            }
        }
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, RepoError> {
        self.ensure_available()?;
        let table = self.table.read().await;
        let today = Utc::now().date_naive();

        Ok(table.rows.values().fold(UserStats::default(), |mut stats, row| {
            stats.total += 1;
            match row.user.status {
                UserStatus::Active => stats.active += 1,
                UserStatus::Inactive => stats.inactive += 1,
            }
            if row.user.created_at.date_naive() == today {
                stats.created_today += 1;
            }
            stats
        }))
    }

    async fn ping(&self) -> Result<(), RepoError> {
        self.ensure_available()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Column comparison with the id as tie-breaker.
fn compare_users(a: &User, b: &User, order_by: OrderBy) -> Ordering {
    let primary = match order_by {
        OrderBy::Id => Ordering::Equal,
        OrderBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        OrderBy::Email => a.email.cmp(&b.email),
        OrderBy::Status => a.status.as_str().cmp(b.status.as_str()),
        OrderBy::CreatedAt => a.created_at.cmp(&b.created_at),
        OrderBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}
