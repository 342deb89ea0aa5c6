//!
//! # Persistence Seams
//!
//! Async traits for everything the service stores, with a Postgres
//! implementation for production and an in-memory implementation used by the
//! integration suites (and handy for local hacking without a database).
//!
//! Store methods answer "not there" with `AppError::NotFound` and transient
//! failures with `AppError::DatabaseError`; callers that need to present a
//! missing record as a 401 (the login path) remap `NotFound` themselves, so
//! an exhausted pool can never be mistaken for bad credentials.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewClient, NewUser, OAuth2Client, Task, TaskInput, TaskQuery, User};

pub use memory::{MemoryClientStore, MemoryTaskStore, MemoryUserStore};
pub use postgres::{PgClientStore, PgTaskStore, PgUserStore};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i32) -> Result<User, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<User, AppError>;
    /// Duplicate username or email answers `BadRequest`.
    async fn create_user(&self, input: NewUser) -> Result<User, AppError>;
    /// Persists an upgraded password hash. Last write wins when two logins
    /// race the upgrade; both hashes are valid for the same password.
    async fn update_user_password(&self, id: i32, hashed_password: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Lookup by the public OAuth2 `client_id` string.
    async fn get_client_by_client_id(&self, client_id: &str) -> Result<OAuth2Client, AppError>;
    async fn create_client(&self, input: NewClient) -> Result<OAuth2Client, AppError>;
    /// Management lookups are scoped to the owner; another user's client is
    /// `NotFound`, indistinguishable from absence.
    async fn get_client(&self, id: i32, user_id: i32) -> Result<OAuth2Client, AppError>;
    async fn get_clients_for_user(&self, user_id: i32) -> Result<Vec<OAuth2Client>, AppError>;
    async fn delete_client(&self, id: i32, user_id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: Task) -> Result<Task, AppError>;
    async fn get_task(&self, id: Uuid, user_id: i32) -> Result<Task, AppError>;
    async fn list_tasks(&self, user_id: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError>;
    async fn update_task(&self, id: Uuid, user_id: i32, input: TaskInput)
        -> Result<Task, AppError>;
    async fn delete_task(&self, id: Uuid, user_id: i32) -> Result<(), AppError>;
}
