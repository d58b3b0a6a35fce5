use chrono::{DateTime, SubsecRound, Utc};
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User, UserInput, UserPage};
use crate::repository::UserRepository;
use crate::store::{StoreError, UserStore};
use crate::validation::{self, FieldErrors};

/// Service layer for User business logic
pub struct UserService<S: UserStore> {
    repository: UserRepository<S>,
}

impl<S: UserStore> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

/// Both stores keep microsecond precision
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn rejected(errors: FieldErrors) -> UserError {
    tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "Rejected user input");
    UserError::Validation(errors)
}

/// Re-check the entity rules right before a write
fn check_entity(entity: &impl Validate) -> UserResult<()> {
    entity
        .validate()
        .map_err(|e| rejected(validation::from_validation_errors(&e)))
}

/// A unique violation here means a concurrent writer took the email
/// between our existence check and the write.
fn write_error(err: StoreError) -> UserError {
    if let StoreError::UniqueViolation(detail) = &err {
        tracing::warn!(detail = %detail, "Unique constraint rejected user write");
    }
    err.into()
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            repository: UserRepository::new(store),
        }
    }

    /// List one page of users. `page` and `limit` must already be clamped.
    pub async fn list_users(&self, page: u64, limit: u64) -> UserResult<UserPage> {
        Ok(self.repository.find_paginated(page, limit).await?)
    }

    pub async fn get_user(&self, id: i64) -> UserResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Create a new user. Status defaults to `pending` when omitted.
    pub async fn create_user(&self, mut input: UserInput) -> UserResult<User> {
        let errors = validation::validate(&input, false);
        if !errors.is_empty() {
            return Err(rejected(errors));
        }

        input.email = input.email.map(|email| validation::normalize_email(&email));

        let user = NewUser::from_input(input, now()).map_err(rejected)?;

        if self.repository.email_exists(&user.email, None).await? {
            return Err(UserError::DuplicateEmail(user.email));
        }

        check_entity(&user)?;

        self.repository.insert(user).await.map_err(write_error)
    }

    /// Apply a partial update. Only supplied fields change; `updated_at` is
    /// always refreshed.
    pub async fn update_user(&self, id: i64, mut input: UserInput) -> UserResult<User> {
        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let errors = validation::validate(&input, true);
        if !errors.is_empty() {
            return Err(rejected(errors));
        }

        if let Some(email) = input.email.as_mut() {
            *email = validation::normalize_email(email);

            if self.repository.email_exists(email, Some(id)).await? {
                return Err(UserError::DuplicateEmail(email.clone()));
            }
        }

        user.apply_input(input).map_err(rejected)?;
        user.touch(now());

        check_entity(&user)?;

        self.repository
            .update(user)
            .await
            .map_err(write_error)?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn delete_user(&self, id: i64) -> UserResult<()> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserStatus};
    use crate::store::{InMemoryUserStore, MockUserStore};
    use chrono::TimeZone;

    fn john() -> UserInput {
        UserInput {
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some("john.doe@example.com".to_string()),
            role: Some("user".to_string()),
            status: None,
        }
    }

    fn stored_user(id: i64) -> User {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        User {
            id,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            role: Role::User,
            status: UserStatus::Pending,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let service = UserService::new(InMemoryUserStore::new());

        let user = service.create_user(john()).await.unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(service.get_user(user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_create_user_lowercases_email() {
        let service = UserService::new(InMemoryUserStore::new());

        let mut input = john();
        input.email = Some("John.Doe@Example.COM".to_string());
        let user = service.create_user(input).await.unwrap();

        assert_eq!(user.email, "john.doe@example.com");
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_any_case() {
        let service = UserService::new(InMemoryUserStore::new());
        service.create_user(john()).await.unwrap();

        let mut input = john();
        input.email = Some("JOHN.DOE@example.com".to_string());
        let err = service.create_user(input).await.unwrap_err();

        assert_eq!(err.errors()["email"], "Email already exists");
    }

    #[tokio::test]
    async fn test_create_user_rejects_unknown_role() {
        let service = UserService::new(InMemoryUserStore::new());

        let mut input = john();
        input.role = Some("superadmin".to_string());
        let err = service.create_user(input).await.unwrap_err();

        let errors = err.errors();
        assert!(errors["role"].contains("admin, manager, user"));
    }

    #[tokio::test]
    async fn test_create_user_validation_skips_storage() {
        let mut store = MockUserStore::new();
        store.expect_exists_by_email().never();
        store.expect_insert().never();

        let service = UserService::new(store);
        let err = service.create_user(UserInput::default()).await.unwrap_err();

        assert!(matches!(err, UserError::Validation(_)));
        assert_eq!(err.errors().len(), 4);
    }

    #[tokio::test]
    async fn test_create_user_existing_email_skips_insert() {
        let mut store = MockUserStore::new();
        store
            .expect_exists_by_email()
            .withf(|email, exclude| email == "john.doe@example.com" && exclude.is_none())
            .returning(|_, _| Ok(true));
        store.expect_insert().never();

        let service = UserService::new(store);
        let err = service.create_user(john()).await.unwrap_err();

        assert!(matches!(err, UserError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_create_user_unique_violation_maps_to_email_conflict() {
        let mut store = MockUserStore::new();
        store.expect_exists_by_email().returning(|_, _| Ok(false));
        store
            .expect_insert()
            .returning(|_| Err(StoreError::UniqueViolation("users_email_key".to_string())));

        let service = UserService::new(store);
        let err = service.create_user(john()).await.unwrap_err();

        assert_eq!(err.errors()["email"], "Email already exists");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_id()
            .with(mockall::predicate::eq(99))
            .returning(|_| Ok(None));

        let service = UserService::new(store);
        let err = service.get_user(99).await.unwrap_err();

        assert!(matches!(err, UserError::NotFound(99)));
        assert_eq!(err.errors()["id"], "User not found");
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(StoreError::Database("connection reset".to_string())));

        let service = UserService::new(store);
        let err = service.get_user(1).await.unwrap_err();

        assert!(matches!(err, UserError::Internal(_)));
    }

    #[tokio::test]
    async fn test_update_user_partial() {
        let service = UserService::new(InMemoryUserStore::new());
        let created = service.create_user(john()).await.unwrap();

        let updated = service
            .update_user(
                created.id,
                UserInput {
                    last_name: Some("Smith".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "John");
        assert_eq!(updated.last_name, "Smith");
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.role, created.role);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_user_keeps_own_email() {
        let service = UserService::new(InMemoryUserStore::new());
        let created = service.create_user(john()).await.unwrap();

        let updated = service
            .update_user(
                created.id,
                UserInput {
                    email: Some("John.Doe@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "john.doe@example.com");
    }

    #[tokio::test]
    async fn test_update_user_email_taken() {
        let service = UserService::new(InMemoryUserStore::new());
        service.create_user(john()).await.unwrap();

        let mut jane = john();
        jane.first_name = Some("Jane".to_string());
        jane.email = Some("jane@example.com".to_string());
        let jane = service.create_user(jane).await.unwrap();

        let err = service
            .update_user(
                jane.id,
                UserInput {
                    email: Some("john.doe@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.errors()["email"], "Email already exists");
        assert_eq!(service.get_user(jane.id).await.unwrap().email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_update_nonexistent_user() {
        let service = UserService::new(InMemoryUserStore::new());
        service.create_user(john()).await.unwrap();

        let err = service
            .update_user(
                999,
                UserInput {
                    first_name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.errors()["id"], "User not found");
        let page = service.list_users(1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.users[0].first_name, "John");
    }

    #[tokio::test]
    async fn test_update_user_invalid_status() {
        let service = UserService::new(InMemoryUserStore::new());
        let created = service.create_user(john()).await.unwrap();

        let err = service
            .update_user(
                created.id,
                UserInput {
                    status: Some("archived".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(err.errors().contains_key("status"));
    }

    #[tokio::test]
    async fn test_update_vanished_row_is_not_found() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_user(id))));
        store.expect_update().returning(|_| Ok(None));

        let service = UserService::new(store);
        let err = service
            .update_user(
                5,
                UserInput {
                    first_name: Some("Jane".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::NotFound(5)));
    }

    #[tokio::test]
    async fn test_delete_user_twice() {
        let service = UserService::new(InMemoryUserStore::new());
        let created = service.create_user(john()).await.unwrap();

        service.delete_user(created.id).await.unwrap();
        let err = service.delete_user(created.id).await.unwrap_err();

        assert_eq!(err.errors()["id"], "User not found");
    }

    #[tokio::test]
    async fn test_list_users_fifteen() {
        let service = UserService::new(InMemoryUserStore::new());
        for i in 0..15 {
            let mut input = john();
            input.email = Some(format!("user{i}@example.com"));
            service.create_user(input).await.unwrap();
        }

        let page = service.list_users(1, 10).await.unwrap();

        assert_eq!(page.users.len(), 10);
        assert_eq!(page.total, 15);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.users[0].email, "user14@example.com");
    }
}
