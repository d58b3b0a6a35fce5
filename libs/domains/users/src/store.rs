use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (the email column)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sort order for paged reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserOrder {
    /// `created_at` descending, later inserts first on ties
    #[default]
    NewestFirst,
    /// `created_at` ascending, earlier inserts first on ties
    OldestFirst,
}

/// Storage adapter for users.
///
/// Implementations own id assignment and must enforce email uniqueness
/// themselves; callers rely on [`StoreError::UniqueViolation`] when two writers
/// race past the application-level check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_page(&self, offset: u64, limit: u64, order: UserOrder)
    -> StoreResult<Vec<User>>;

    async fn count_all(&self) -> StoreResult<u64>;

    /// Exact match on the stored email, optionally ignoring one id
    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool>;

    /// Persist a new user and return it with its assigned id
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    /// Overwrite an existing row. Returns `None` if the row no longer exists.
    async fn update(&self, user: User) -> StoreResult<Option<User>>;

    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    last_id: i64,
}

/// In-memory implementation of UserStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_page(
        &self,
        offset: u64,
        limit: u64,
        order: UserOrder,
    ) -> StoreResult<Vec<User>> {
        let table = self.table.read().await;

        let mut users: Vec<User> = table.rows.values().cloned().collect();
        match order {
            UserOrder::NewestFirst => {
                users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            UserOrder::OldestFirst => {
                users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
        }

        Ok(users
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_all(&self) -> StoreResult<u64> {
        let table = self.table.read().await;
        Ok(table.rows.len() as u64)
    }

    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .any(|u| u.email == email && Some(u.id) != exclude_id))
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(user.email));
        }

        table.last_id += 1;
        let user = User::from_new(table.last_id, user);
        table.rows.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, user: User) -> StoreResult<Option<User>> {
        let mut table = self.table.write().await;

        if !table.rows.contains_key(&user.id) {
            return Ok(None);
        }

        if table
            .rows
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::UniqueViolation(user.email));
        }

        table.rows.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, "Updated user");
        Ok(Some(user))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut table = self.table.write().await;

        if table.rows.remove(&id).is_some() {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
