use color_eyre::Result;
use sqlx::PgPool;

use crate::users::User;

pub struct Subscription;

impl Subscription {
    /// Follows `author_user_id`, returning `false` when already following.
    #[tracing::instrument(skip(pool), err)]
    pub async fn create(pool: &PgPool, user_id: i64, author_user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO subscriptions (user_id, author_user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(author_user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unfollows `author_user_id`, returning `false` when there was nothing to remove.
    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, user_id: i64, author_user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_user_id = $2")
                .bind(user_id)
                .bind(author_user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// An author the user follows, with how many recipes they have published.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscribedAuthor {
    #[sqlx(flatten)]
    pub author: User,
    pub recipes_count: i64,
}

impl SubscribedAuthor {
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>> {
        let authors = sqlx::query_as::<_, SubscribedAuthor>(
            r"
            SELECT
                u.user_id,
                u.email,
                u.username,
                u.first_name,
                u.last_name,
                u.role,
                u.created_at,
                (SELECT COUNT(*) FROM recipes r WHERE r.author_user_id = u.user_id) AS recipes_count
            FROM subscriptions s
            JOIN users u ON u.user_id = s.author_user_id
            WHERE s.user_id = $1
            ORDER BY u.user_id
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(authors)
    }

    pub async fn get(pool: &PgPool, author_user_id: i64) -> Result<Option<Self>> {
        let author = sqlx::query_as::<_, SubscribedAuthor>(
            r"
            SELECT
                u.user_id,
                u.email,
                u.username,
                u.first_name,
                u.last_name,
                u.role,
                u.created_at,
                (SELECT COUNT(*) FROM recipes r WHERE r.author_user_id = u.user_id) AS recipes_count
            FROM users u
            WHERE u.user_id = $1
            ",
        )
        .bind(author_user_id)
        .fetch_optional(pool)
        .await?;

        Ok(author)
    }
}
