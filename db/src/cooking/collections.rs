use color_eyre::Result;
use sqlx::PgPool;

/// Per-user recipe lists that hold at most one entry per recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeCollection {
    Favorites,
    ShoppingCart,
}

impl RecipeCollection {
    fn table(self) -> &'static str {
        match self {
            RecipeCollection::Favorites => "favorites",
            RecipeCollection::ShoppingCart => "shopping_cart",
        }
    }

    /// Adds the recipe, returning `false` when it was already there.
    #[tracing::instrument(skip(pool), err)]
    pub async fn add(self, pool: &PgPool, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            r"
            INSERT INTO {} (user_id, recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, recipe_id) DO NOTHING
            ",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Removes the recipe, returning `false` when it was not there.
    #[tracing::instrument(skip(pool), err)]
    pub async fn remove(self, pool: &PgPool, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn contains(self, pool: &PgPool, user_id: i64, recipe_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
