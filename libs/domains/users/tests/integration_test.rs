//! Integration tests for Users domain
//!
//! These run against real PostgreSQL via testcontainers (`TestDatabase`
//! applies the schema migrations) to check:
//! - Entity mapping and id assignment
//! - The unique email constraint
//! - Ordering and pagination in SQL
//!
//! They need Docker, so they are ignored by default:
//! `cargo test -p domain_users --test integration_test -- --ignored`

use chrono::{Duration, SubsecRound, TimeZone, Utc};
use domain_users::*;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

fn new_user(email: String, offset_secs: i64) -> NewUser {
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(offset_secs);
    NewUser {
        first_name: "Integration".to_string(),
        last_name: "Tester".to_string(),
        email,
        role: Role::User,
        status: UserStatus::Pending,
        created_at: at,
        updated_at: at,
    }
}

// ============================================================================
// Store Tests
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insert_and_find() {
    let db = TestDatabase::new().await;
    let store = PgUserStore::new(db.connection());
    let builder = TestDataBuilder::from_test_name("insert_and_find");

    let created = store
        .insert(new_user(builder.email("main"), 0))
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.status, UserStatus::Pending);

    let found = assert_some(
        store.find_by_id(created.id).await.unwrap(),
        "user should exist",
    );
    assert_eq!(found, created);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unique_email_constraint() {
    let db = TestDatabase::new().await;
    let store = PgUserStore::new(db.connection());
    let builder = TestDataBuilder::from_test_name("unique_email");

    store
        .insert(new_user(builder.email("dup"), 0))
        .await
        .unwrap();
    let result = store.insert(new_user(builder.email("dup"), 1)).await;

    assert!(
        matches!(result, Err(StoreError::UniqueViolation(_))),
        "expected unique violation, got {result:?}"
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_and_delete() {
    let db = TestDatabase::new().await;
    let store = PgUserStore::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_and_delete");

    let mut user = store
        .insert(new_user(builder.email("main"), 0))
        .await
        .unwrap();
    user.last_name = "Updated".to_string();
    user.status = UserStatus::Active;
    user.touch(Utc::now().trunc_subsecs(6));

    let updated = assert_some(store.update(user.clone()).await.unwrap(), "row exists");
    assert_eq!(updated, user);

    assert!(store.delete(user.id).await.unwrap());
    assert!(!store.delete(user.id).await.unwrap());
    assert_eq!(store.update(user).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pagination_order_and_totals() {
    let db = TestDatabase::new().await;
    let repo = UserRepository::new(PgUserStore::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("pagination");

    for i in 0..15 {
        repo.insert(new_user(builder.email(&i.to_string()), i))
            .await
            .unwrap();
    }

    let page = repo.find_paginated(1, 10).await.unwrap();
    assert_eq!(page.users.len(), 10);
    assert_eq!(page.total, 15);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.users[0].email, builder.email("14"));

    let page = repo.find_paginated(3, 10).await.unwrap();
    assert!(page.users.is_empty());
    assert_eq!(page.total, 15);
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_service_email_conflict_is_case_insensitive() {
    let db = TestDatabase::new().await;
    let service = UserService::new(PgUserStore::new(db.connection()));

    let input = |email: &str| UserInput {
        first_name: Some("Jane".to_string()),
        last_name: Some("Roe".to_string()),
        email: Some(email.to_string()),
        role: Some("admin".to_string()),
        status: Some("active".to_string()),
    };

    let created = service.create_user(input("Jane@Example.com")).await.unwrap();
    assert_eq!(created.email, "jane@example.com");
    assert_eq!(created.role, Role::Admin);

    let err = service
        .create_user(input("JANE@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.errors()["email"], "Email already exists");
}
