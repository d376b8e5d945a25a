use std::collections::BTreeSet;

use color_eyre::Result;
use sqlx::{PgConnection, PgPool};

use super::{contains_pattern, reconcile::SetChanges};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Tag {
    pub async fn create(pool: &PgPool, name: &str, color: &str, slug: &str) -> Result<Self> {
        let tag = sqlx::query_as::<_, Tag>(
            r"
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING tag_id, name, color, slug
            ",
        )
        .bind(name)
        .bind(color)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    pub async fn get_by_id(pool: &PgPool, tag_id: i64) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Tag>(
            r"
            SELECT tag_id, name, color, slug
            FROM tags
            WHERE tag_id = $1
            ",
        )
        .bind(tag_id)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// All tags by id, optionally narrowed to names containing `search`.
    pub async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<Self>> {
        let pattern = search.map(contains_pattern);

        let tags = sqlx::query_as::<_, Tag>(
            r"
            SELECT tag_id, name, color, slug
            FROM tags
            WHERE $1::TEXT IS NULL OR name ILIKE $1
            ORDER BY tag_id
            ",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Which of `tag_ids` actually exist.
    pub async fn existing_ids(pool: &PgPool, tag_ids: &[i64]) -> Result<BTreeSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM tags WHERE tag_id = ANY($1)")
            .bind(tag_ids)
            .fetch_all(pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeTag {
    pub recipe_id: i64,
    #[sqlx(flatten)]
    pub tag: Tag,
}

impl RecipeTag {
    pub async fn get_by_recipes(pool: &PgPool, recipe_ids: &[i64]) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, RecipeTag>(
            r"
            SELECT rt.recipe_id, t.tag_id, t.name, t.color, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.tag_id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY rt.recipe_id, t.tag_id
            ",
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    pub(crate) async fn ids_for_recipe(
        conn: &mut PgConnection,
        recipe_id: i64,
    ) -> Result<BTreeSet<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT tag_id FROM recipe_tags WHERE recipe_id = $1")
                .bind(recipe_id)
                .fetch_all(&mut *conn)
                .await?;

        Ok(ids.into_iter().collect())
    }

    #[tracing::instrument(skip(conn), err)]
    pub(crate) async fn apply(
        conn: &mut PgConnection,
        recipe_id: i64,
        changes: &SetChanges,
    ) -> Result<()> {
        if !changes.delete.is_empty() {
            sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1 AND tag_id = ANY($2)")
                .bind(recipe_id)
                .bind(&changes.delete)
                .execute(&mut *conn)
                .await?;
        }

        if !changes.insert.is_empty() {
            sqlx::query(
                r"
                INSERT INTO recipe_tags (recipe_id, tag_id)
                SELECT $1, tag_id FROM UNNEST($2::BIGINT[]) AS tag_id
                ",
            )
            .bind(recipe_id)
            .bind(&changes.insert)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
