//! Account persistence
//!
//! Handlers only talk to the `UserStore` trait. Two backends exist: an
//! in-process store for development and tests, and Postgres.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::models::{NewUser, User, UserChanges, UserFilter};

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Data-access contract for accounts
///
/// Email is unique across accounts; `create` and `update_one` report a
/// clash as `DatabaseError::UniqueConstraintViolation`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All accounts matching `filter`, oldest first
    async fn find(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;

    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>>;

    /// Persist a new account. The credential must already be hashed.
    async fn create(&self, input: NewUser) -> StoreResult<User>;

    /// Apply `changes` to the first match, returning the updated record
    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> StoreResult<Option<User>>;

    /// Remove the first match, returning what was removed
    async fn destroy_one(&self, filter: &UserFilter) -> StoreResult<Option<User>>;
}
