use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, Instrument};

use super::postgres_span;
use crate::models::{RepositoryError, RepositoryResult, Role, User};

/// Account storage used by the auth service
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. A taken username surfaces as a unique
    /// `ConstraintViolation`.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> RepositoryResult<User>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
}

/// PostgreSQL implementation of the UserRepository trait
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|message| RepositoryError::Database { message })?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, password_hash), fields(username = %username, role = %role))]
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, role, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.to_string())
        .fetch_one(&self.pool)
        .instrument(postgres_span("INSERT", "users"))
        .await?;

        info!(user_id = row.id, "User created");
        User::try_from(row)
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .instrument(postgres_span("SELECT", "users"))
        .await?;

        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self), fields(user_id = id))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .instrument(postgres_span("SELECT", "users"))
        .await?;

        row.map(User::try_from).transpose()
    }
}
