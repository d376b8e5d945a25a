use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown user role: {0}")]
pub struct UserRoleParseError(String);

impl FromStr for UserRole {
    type Err = UserRoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(UserRoleParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = UserRoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub async fn create(pool: &PgPool, new_user: &NewUser) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (email, username, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, email, username, first_name, last_name, role, created_at
            ",
        )
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &PgPool, user_id: i64) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT user_id, email, username, first_name, last_name, role, created_at
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(pool, key), err)]
    pub async fn find_by_token(pool: &PgPool, key: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT u.user_id, u.email, u.username, u.first_name, u.last_name, u.role, u.created_at
            FROM auth_tokens t
            JOIN users u ON u.user_id = t.user_id
            WHERE t.key = $1
            ",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

/// API tokens are provisioned outside this service; this only records one for
/// an existing user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub async fn create(pool: &PgPool, user_id: i64, key: &str) -> Result<Self> {
        let token = sqlx::query_as::<_, AuthToken>(
            r"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            RETURNING key, user_id, created_at
            ",
        )
        .bind(key)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }
}

/// A user as seen by `viewer`, carrying whether the viewer follows them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfile {
    #[sqlx(flatten)]
    pub user: User,
    pub is_subscribed: bool,
}

const PROFILE_SELECT: &str = r"
    SELECT
        u.user_id,
        u.email,
        u.username,
        u.first_name,
        u.last_name,
        u.role,
        u.created_at,
        EXISTS (
            SELECT 1 FROM subscriptions s
            WHERE s.user_id = $1 AND s.author_user_id = u.user_id
        ) AS is_subscribed
    FROM users u
";

impl UserProfile {
    pub async fn list(pool: &PgPool, viewer: Option<i64>) -> Result<Vec<Self>> {
        let profiles = sqlx::query_as::<_, UserProfile>(&format!(
            "{PROFILE_SELECT} ORDER BY u.user_id"
        ))
        .bind(viewer)
        .fetch_all(pool)
        .await?;

        Ok(profiles)
    }

    pub async fn get(pool: &PgPool, user_id: i64, viewer: Option<i64>) -> Result<Option<Self>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "{PROFILE_SELECT} WHERE u.user_id = $2"
        ))
        .bind(viewer)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    pub async fn get_many(
        pool: &PgPool,
        user_ids: &[i64],
        viewer: Option<i64>,
    ) -> Result<Vec<Self>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = sqlx::query_as::<_, UserProfile>(&format!(
            "{PROFILE_SELECT} WHERE u.user_id = ANY($2) ORDER BY u.user_id"
        ))
        .bind(viewer)
        .bind(user_ids)
        .fetch_all(pool)
        .await?;

        Ok(profiles)
    }
}
