//! Users Domain
//!
//! CRUD over a single `users` resource with field validation, case-insensitive
//! email uniqueness and newest-first pagination.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, query clamping, JSON shapes
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, email uniqueness, timestamps
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Pagination and existence checks
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Store    │  ← Storage trait (in-memory, PostgreSQL)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{handlers, InMemoryUserStore, UserService};
//!
//! let service = UserService::new(InMemoryUserStore::new());
//! let router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{NewUser, Role, User, UserInput, UserPage, UserStatus, UserView};
pub use postgres::PgUserStore;
pub use repository::UserRepository;
pub use service::UserService;
pub use store::{InMemoryUserStore, StoreError, UserOrder, UserStore};
pub use validation::FieldErrors;
