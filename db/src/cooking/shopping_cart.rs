use std::collections::BTreeMap;

use color_eyre::Result;
use sqlx::PgPool;

/// One ingredient line of one recipe in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl CartLine {
    pub async fn for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r"
            SELECT ri.recipe_id, i.ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM shopping_cart c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Cart lines summed per ingredient, ordered by name then unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut totals: BTreeMap<i64, ShoppingListItem> = BTreeMap::new();

        for line in lines {
            totals
                .entry(line.ingredient_id)
                .or_insert_with(|| ShoppingListItem {
                    ingredient_id: line.ingredient_id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                    total: 0,
                })
                .total += i64::from(line.amount);
        }

        let mut items: Vec<_> = totals.into_values().collect();
        items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
                .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
        });

        Self { items }
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn for_user(pool: &PgPool, user_id: i64) -> Result<Self> {
        let lines = CartLine::for_user(pool, user_id).await?;

        Ok(Self::aggregate(lines))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
