use std::sync::Arc;

use crate::models::{NewUser, User, UserPage};
use crate::store::{StoreResult, UserOrder, UserStore};

/// Query layer over a [`UserStore`]: pagination and existence checks
pub struct UserRepository<S: UserStore> {
    store: Arc<S>,
}

impl<S: UserStore> Clone for UserRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: UserStore> UserRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Fetch one page of users, newest first.
    ///
    /// `page` is 1-based. A page past the end returns no users but still
    /// reports the real totals; the store is not asked for rows there.
    pub async fn find_paginated(&self, page: u64, limit: u64) -> StoreResult<UserPage> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let total = self.store.count_all().await?;

        let users = if offset >= total {
            Vec::new()
        } else {
            self.store
                .find_page(offset, limit, UserOrder::NewestFirst)
                .await?
        };
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };

        Ok(UserPage {
            users,
            total,
            page,
            limit,
            total_pages,
        })
    }

    /// True if another user already holds `email`
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool> {
        self.store.exists_by_email(email, exclude_id).await
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.store.find_by_id(id).await
    }

    pub async fn insert(&self, user: NewUser) -> StoreResult<User> {
        self.store.insert(user).await
    }

    pub async fn update(&self, user: User) -> StoreResult<Option<User>> {
        self.store.update(user).await
    }

    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        self.store.delete(id).await
    }
}
