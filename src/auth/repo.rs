use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PublicUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; holds the field name.
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for users and their refresh tokens.
///
/// Every mutation is a single atomic statement against one user; callers
/// never read-modify-write the token collection.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// First user whose username equals `login`, or whose email equals it
    /// ignoring case. Emails are stored lowercased.
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>>;

    /// First user holding either the given username or email.
    async fn find_conflicting(&self, username: &str, email: &str) -> anyhow::Result<Option<User>>;

    /// Loads the public projection only (no hash, no tokens).
    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>>;

    async fn list_public(&self) -> anyhow::Result<Vec<PublicUser>>;

    /// Returns false when no such user existed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn add_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<u64>;

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> anyhow::Result<u64>;

    /// Exact match on `token` among entries created after `not_before`.
    async fn has_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        not_before: OffsetDateTime,
    ) -> anyhow::Result<bool>;

    /// Deletes every entry created at or before `not_before`, for all users.
    async fn purge_refresh_tokens(&self, not_before: OffsetDateTime) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps the unique constraints declared in the migrations to field names.
fn conflicting_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "email",
        _ => "username",
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(conflicting_field(db_err.constraint())))
            }
            Err(e) => Err(StoreError::Backend(anyhow::Error::new(e).context("insert user"))),
        }
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1 OR email = lower($1)
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_conflicting(&self, username: &str, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1 OR email = $2
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"SELECT id, username, email, created_at, updated_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_public(&self) -> anyhow::Result<Vec<PublicUser>> {
        let users = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, username, email, created_at, updated_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            WITH appended AS (
                INSERT INTO refresh_tokens (user_id, token, created_at)
                VALUES ($1, $2, $3)
                RETURNING user_id
            )
            UPDATE users SET updated_at = now()
            WHERE id IN (SELECT user_id FROM appended)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<u64> {
        let removed: i64 = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM refresh_tokens
                WHERE user_id = $1 AND token = $2
                RETURNING user_id
            ),
            touched AS (
                UPDATE users SET updated_at = now()
                WHERE id IN (SELECT user_id FROM removed)
            )
            SELECT count(*) FROM removed
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.db)
        .await?;
        Ok(removed as u64)
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let removed: i64 = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM refresh_tokens
                WHERE user_id = $1
                RETURNING user_id
            ),
            touched AS (
                UPDATE users SET updated_at = now()
                WHERE id IN (SELECT user_id FROM removed)
            )
            SELECT count(*) FROM removed
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(removed as u64)
    }

    async fn has_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        not_before: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM refresh_tokens
                WHERE user_id = $1 AND token = $2 AND created_at > $3
            )
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(not_before)
        .fetch_one(&self.db)
        .await?;
        Ok(found)
    }

    async fn purge_refresh_tokens(&self, not_before: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM refresh_tokens WHERE created_at <= $1")
            .bind(not_before)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
