use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use crate::models::{NewUser, User, UserChanges, UserFilter};
use crate::store::{StoreResult, UserStore};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

/// Postgres implementation of UserStore
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `./migrations`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Append `WHERE ...` for the filter; empty filters match every row.
    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
        builder.push(" WHERE TRUE");
        if let Some(id) = filter.id {
            builder.push(" AND id = ").push_bind(id);
        }
        if let Some(email) = &filter.email {
            builder.push(" AND email = ").push_bind(email.clone());
        }
    }

    /// Subquery selecting the id of the first matching row
    fn push_first_match(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
        builder.push(" WHERE id = (SELECT id FROM users");
        Self::push_filter(builder, filter);
        builder.push(" ORDER BY created_at LIMIT 1)");
    }

    fn select_query(filter: &UserFilter, first_only: bool) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM users", USER_COLUMNS));
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at");
        if first_only {
            builder.push(" LIMIT 1");
        }
        builder
    }

    fn update_query(filter: &UserFilter, changes: UserChanges) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("UPDATE users SET email = COALESCE(");
        builder
            .push_bind(changes.email)
            .push(", email), name = COALESCE(")
            .push_bind(changes.name)
            .push(", name), updated_at = ")
            .push_bind(Utc::now());
        Self::push_first_match(&mut builder, filter);
        builder.push(format!(" RETURNING {}", USER_COLUMNS));
        builder
    }

    fn delete_query(filter: &UserFilter) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("DELETE FROM users");
        Self::push_first_match(&mut builder, filter);
        builder.push(format!(" RETURNING {}", USER_COLUMNS));
        builder
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn find(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let mut builder = Self::select_query(filter, false);
        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        let mut builder = Self::select_query(filter, true);
        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: NewUser) -> StoreResult<User> {
        let user = User::new(input);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "User row inserted");
        Ok(user)
    }

    #[instrument(skip(self, changes))]
    async fn update_one(
        &self,
        filter: &UserFilter,
        changes: UserChanges,
    ) -> StoreResult<Option<User>> {
        let mut builder = Self::update_query(filter, changes);
        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn destroy_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        let mut builder = Self::delete_query(filter);
        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn select_all() -> String {
        format!("SELECT {} FROM users", USER_COLUMNS)
    }

    #[test]
    fn test_select_with_empty_filter_matches_all() {
        let builder = PgUserStore::select_query(&UserFilter::default(), false);
        assert_eq!(
            builder.sql(),
            format!("{} WHERE TRUE ORDER BY created_at", select_all())
        );
    }

    #[test]
    fn test_select_by_id_and_by_email() {
        let by_id = PgUserStore::select_query(&UserFilter::by_id(Uuid::new_v4()), true);
        assert_eq!(
            by_id.sql(),
            format!("{} WHERE TRUE AND id = $1 ORDER BY created_at LIMIT 1", select_all())
        );

        let by_email = PgUserStore::select_query(&UserFilter::by_email("dan@x.com"), true);
        assert_eq!(
            by_email.sql(),
            format!("{} WHERE TRUE AND email = $1 ORDER BY created_at LIMIT 1", select_all())
        );
    }

    #[test]
    fn test_select_with_both_fields() {
        let filter = UserFilter {
            id: Some(Uuid::new_v4()),
            email: Some("dan@x.com".to_string()),
        };
        let builder = PgUserStore::select_query(&filter, false);
        assert_eq!(
            builder.sql(),
            format!(
                "{} WHERE TRUE AND id = $1 AND email = $2 ORDER BY created_at",
                select_all()
            )
        );
    }

    #[test]
    fn test_update_targets_first_match_only() {
        let changes = UserChanges {
            email: None,
            name: Some("Dan".to_string()),
        };
        let builder = PgUserStore::update_query(&UserFilter::by_id(Uuid::new_v4()), changes);
        assert_eq!(
            builder.sql(),
            format!(
                "UPDATE users SET email = COALESCE($1, email), name = COALESCE($2, name), \
                 updated_at = $3 WHERE id = (SELECT id FROM users WHERE TRUE AND id = $4 \
                 ORDER BY created_at LIMIT 1) RETURNING {}",
                USER_COLUMNS
            )
        );
    }

    #[test]
    fn test_delete_targets_first_match_only() {
        let builder = PgUserStore::delete_query(&UserFilter::by_email("dan@x.com"));
        assert_eq!(
            builder.sql(),
            format!(
                "DELETE FROM users WHERE id = (SELECT id FROM users WHERE TRUE AND email = $1 \
                 ORDER BY created_at LIMIT 1) RETURNING {}",
                USER_COLUMNS
            )
        );
    }
}
