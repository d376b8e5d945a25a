use std::collections::{BTreeMap, BTreeSet};

use color_eyre::Result;
use sqlx::{PgConnection, PgPool, QueryBuilder};

use super::{contains_pattern, escape_like, reconcile::AmountChanges};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    pub async fn create(pool: &PgPool, name: &str, measurement_unit: &str) -> Result<Self> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING ingredient_id, name, measurement_unit
            ",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(pool)
        .await?;

        Ok(ingredient)
    }

    pub async fn get_by_id(pool: &PgPool, ingredient_id: i64) -> Result<Option<Self>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r"
            SELECT ingredient_id, name, measurement_unit
            FROM ingredients
            WHERE ingredient_id = $1
            ",
        )
        .bind(ingredient_id)
        .fetch_optional(pool)
        .await?;

        Ok(ingredient)
    }

    /// Ingredients ordered by name. With a `name` query only those containing
    /// it (case-insensitively) are returned, names starting with it first.
    pub async fn search(pool: &PgPool, name: Option<&str>) -> Result<Vec<Self>> {
        let ingredients = match name {
            None => {
                sqlx::query_as::<_, Ingredient>(
                    r"
                    SELECT ingredient_id, name, measurement_unit
                    FROM ingredients
                    ORDER BY name, ingredient_id
                    ",
                )
                .fetch_all(pool)
                .await?
            }
            Some(name) => {
                sqlx::query_as::<_, Ingredient>(
                    r"
                    SELECT ingredient_id, name, measurement_unit
                    FROM ingredients
                    WHERE name ILIKE $1
                    ORDER BY (name ILIKE $2) DESC, name, ingredient_id
                    ",
                )
                .bind(contains_pattern(name))
                .bind(format!("{}%", escape_like(name)))
                .fetch_all(pool)
                .await?
            }
        };

        Ok(ingredients)
    }

    /// Which of `ingredient_ids` actually exist.
    pub async fn existing_ids(pool: &PgPool, ingredient_ids: &[i64]) -> Result<BTreeSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT ingredient_id FROM ingredients WHERE ingredient_id = ANY($1)",
        )
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

/// An ingredient as used by one recipe, with the amount it calls for.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RecipeIngredient {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl RecipeIngredient {
    pub async fn get_by_recipes(pool: &PgPool, recipe_ids: &[i64]) -> Result<Vec<Self>> {
        let ingredients = sqlx::query_as::<_, RecipeIngredient>(
            r"
            SELECT ri.recipe_id, i.ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.recipe_id, i.name, i.ingredient_id
            ",
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }

    pub(crate) async fn amounts_for_recipe(
        conn: &mut PgConnection,
        recipe_id: i64,
    ) -> Result<BTreeMap<i64, i32>> {
        let rows: Vec<(i64, i32)> = sqlx::query_as(
            "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1",
        )
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().collect())
    }

    #[tracing::instrument(skip(conn), err)]
    pub(crate) async fn apply(
        conn: &mut PgConnection,
        recipe_id: i64,
        changes: &AmountChanges,
    ) -> Result<()> {
        if !changes.delete.is_empty() {
            sqlx::query(
                "DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND ingredient_id = ANY($2)",
            )
            .bind(recipe_id)
            .bind(&changes.delete)
            .execute(&mut *conn)
            .await?;
        }

        for (ingredient_id, amount) in &changes.update {
            sqlx::query(
                r"
                UPDATE recipe_ingredients
                SET amount = $3
                WHERE recipe_id = $1 AND ingredient_id = $2
                ",
            )
            .bind(recipe_id)
            .bind(ingredient_id)
            .bind(amount)
            .execute(&mut *conn)
            .await?;
        }

        if !changes.insert.is_empty() {
            let mut query_builder =
                QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)");

            query_builder.push_values(&changes.insert, |mut b, (ingredient_id, amount)| {
                b.push_bind(recipe_id)
                    .push_bind(*ingredient_id)
                    .push_bind(*amount);
            });

            query_builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_search_prefers_prefix_matches(pool: PgPool) {
        let brown_sugar = Ingredient::create(&pool, "brown sugar", "g").await.unwrap();
        let sugar = Ingredient::create(&pool, "sugar", "g").await.unwrap();
        let salt = Ingredient::create(&pool, "salt", "g").await.unwrap();

        let found = Ingredient::search(&pool, Some("SUG")).await.unwrap();
        assert_eq!(found, vec![sugar.clone(), brown_sugar.clone()]);

        let all = Ingredient::search(&pool, None).await.unwrap();
        assert_eq!(all, vec![brown_sugar, salt, sugar]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_name_and_unit_are_unique_together(pool: PgPool) {
        Ingredient::create(&pool, "milk", "ml").await.unwrap();
        Ingredient::create(&pool, "milk", "cup").await.unwrap();

        assert!(Ingredient::create(&pool, "milk", "ml").await.is_err());
    }
}
