use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::models::{NewUser, User, UserChanges, UserFilter};
use crate::store::{StoreResult, UserStore};

/// In-memory implementation of UserStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    // Insertion order doubles as creation order.
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_email(email: &str) -> DatabaseError {
    DatabaseError::UniqueConstraintViolation(format!("Email already registered: {}", email))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| filter.matches(u)).cloned())
    }

    async fn create(&self, input: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.email == input.email) {
            return Err(duplicate_email(&input.email));
        }

        let user = User::new(input);
        users.push(user.clone());

        tracing::debug!(user_id = %user.id, "Stored new user in memory");
        Ok(user)
    }

    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        let Some(index) = users.iter().position(|u| filter.matches(u)) else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            let target = users[index].id;
            if users.iter().any(|u| u.id != target && &u.email == email) {
                return Err(duplicate_email(email));
            }
        }

        changes.apply(&mut users[index]);
        Ok(Some(users[index].clone()))
    }

    async fn destroy_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        Ok(users
            .iter()
            .position(|u| filter.matches(u))
            .map(|index| users.remove(index)))
    }
}
