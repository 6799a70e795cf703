use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract shared by the auth and profile controllers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Match on the token and on an expiry strictly after `now`.
    async fn find_by_reset_token(&self, token: &str, now: OffsetDateTime)
        -> StoreResult<Option<User>>;
    /// Fails with `StoreError::DuplicateEmail` when the email is taken.
    async fn insert(&self, new_user: NewUser) -> StoreResult<User>;
    /// Replaces the hash; `clear_reset` also drops any pending reset token.
    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_reset: bool,
    ) -> StoreResult<User>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<User>;
    async fn set_names(&self, id: Uuid, firstname: &str, lastname: &str) -> StoreResult<User>;
}

const USER_COLUMNS: &str = "id, email, firstname, lastname, password_hash, \
     reset_token, reset_token_expire, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expire > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, firstname, lastname, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.firstname)
        .bind(&new_user.lastname)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_reset: bool,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET password_hash = $2,
                   reset_token = CASE WHEN $3 THEN NULL ELSE reset_token END,
                   reset_token_expire = CASE WHEN $3 THEN NULL ELSE reset_token_expire END,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(password_hash)
        .bind(clear_reset)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET reset_token = $2,
                   reset_token_expire = $3,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_names(&self, id: Uuid, firstname: &str, lastname: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET firstname = $2,
                   lastname = $3,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(firstname)
        .bind(lastname)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(err),
    }
}
