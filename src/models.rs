//! Account records and the filter/change shapes used by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::IdentityClaim;

/// A stored account
///
/// `password` holds the bcrypt credential, never the plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[sqlx(rename = "password_hash")]
    pub password: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: input.id,
            email: input.email,
            name: input.name,
            password: input.password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// The claim embedded in tokens issued for this account
    pub fn identity(&self) -> IdentityClaim {
        IdentityClaim::new(self.id.to_string(), self.name.clone())
    }
}

/// Fields for a new account; the password is already hashed
///
/// The id is assigned up front so tokens can be signed before anything is
/// stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
        }
    }

    pub fn identity(&self) -> IdentityClaim {
        IdentityClaim::new(self.id.to_string(), self.name.clone())
    }
}

/// Account fields safe to list and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Match criteria; `None` fields do not constrain the match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.id.map_or(true, |id| user.id == id)
            && self.email.as_ref().map_or(true, |email| &user.email == email)
    }
}

/// Profile edits; the password cannot be changed through this path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        user.updated_at = Utc::now();
    }
}
