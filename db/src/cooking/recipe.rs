use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use itertools::Itertools;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{
    contains_pattern,
    ingredients::RecipeIngredient,
    reconcile::{AmountChanges, SetChanges},
    tags::{RecipeTag, Tag},
};
use crate::users::{User, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Recipe {
    pub recipe_id: i64,
    pub author_user_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to write a new recipe, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: BTreeMap<i64, i32>,
    pub tags: BTreeSet<i64>,
}

/// A partial update. `None` leaves the field as it is; for `image`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub image: Option<Option<String>>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<BTreeMap<i64, i32>>,
    pub tags: Option<BTreeSet<i64>>,
}

impl Recipe {
    pub fn can_be_edited_by(&self, user: &User) -> bool {
        self.author_user_id == user.user_id || user.is_admin()
    }

    pub async fn get_by_id(pool: &PgPool, recipe_id: i64) -> Result<Option<Self>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r"
            SELECT recipe_id, author_user_id, name, image, text, cooking_time, created_at
            FROM recipes
            WHERE recipe_id = $1
            ",
        )
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        Ok(recipe)
    }

    #[tracing::instrument(skip(pool, draft), err)]
    pub async fn create(pool: &PgPool, author_user_id: i64, draft: &RecipeDraft) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r"
            INSERT INTO recipes (author_user_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING recipe_id, author_user_id, name, image, text, cooking_time, created_at
            ",
        )
        .bind(author_user_id)
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        let ingredient_changes = AmountChanges::between(&BTreeMap::new(), &draft.ingredients);
        RecipeIngredient::apply(&mut transaction, recipe.recipe_id, &ingredient_changes).await?;

        let tag_changes = SetChanges::between(&BTreeSet::new(), &draft.tags);
        RecipeTag::apply(&mut transaction, recipe.recipe_id, &tag_changes).await?;

        transaction.commit().await?;

        tracing::info!(recipe_id = recipe.recipe_id, "Created recipe");

        Ok(recipe)
    }

    /// Applies `patch`, reconciling ingredients and tags against what is
    /// stored so unchanged association rows are left alone.
    #[tracing::instrument(skip(self, pool, patch), fields(recipe_id = self.recipe_id), err)]
    pub async fn update(&self, pool: &PgPool, patch: &RecipePatch) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            r"
            UPDATE recipes
            SET name = COALESCE($2, name),
                text = COALESCE($3, text),
                cooking_time = COALESCE($4, cooking_time),
                image = CASE WHEN $5 THEN $6 ELSE image END
            WHERE recipe_id = $1
            RETURNING recipe_id, author_user_id, name, image, text, cooking_time, created_at
            ",
        )
        .bind(self.recipe_id)
        .bind(&patch.name)
        .bind(&patch.text)
        .bind(patch.cooking_time)
        .bind(patch.image.is_some())
        .bind(patch.image.clone().flatten())
        .fetch_one(&mut *transaction)
        .await?;

        if let Some(desired) = &patch.ingredients {
            let current = RecipeIngredient::amounts_for_recipe(&mut transaction, self.recipe_id).await?;
            let changes = AmountChanges::between(&current, desired);

            if !changes.is_empty() {
                RecipeIngredient::apply(&mut transaction, self.recipe_id, &changes).await?;
            }
        }

        if let Some(desired) = &patch.tags {
            let current = RecipeTag::ids_for_recipe(&mut transaction, self.recipe_id).await?;
            let changes = SetChanges::between(&current, desired);

            if !changes.is_empty() {
                RecipeTag::apply(&mut transaction, self.recipe_id, &changes).await?;
            }
        }

        transaction.commit().await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// The compact form used inside favorites, carts and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RecipeShort {
    pub recipe_id: i64,
    pub author_user_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeShort {
    fn from(recipe: Recipe) -> Self {
        Self {
            recipe_id: recipe.recipe_id,
            author_user_id: recipe.author_user_id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

impl RecipeShort {
    /// Newest recipes of each author, at most `limit` per author when given.
    pub async fn list_by_authors(
        pool: &PgPool,
        author_user_ids: &[i64],
        limit: Option<i64>,
    ) -> Result<Vec<Self>> {
        if author_user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let recipes = sqlx::query_as::<_, RecipeShort>(
            r"
            SELECT recipe_id, author_user_id, name, image, cooking_time
            FROM (
                SELECT
                    recipe_id,
                    author_user_id,
                    name,
                    image,
                    cooking_time,
                    ROW_NUMBER() OVER (
                        PARTITION BY author_user_id
                        ORDER BY created_at DESC, recipe_id DESC
                    ) AS position
                FROM recipes
                WHERE author_user_id = ANY($1)
            ) ranked
            WHERE $2::BIGINT IS NULL OR position <= $2
            ORDER BY author_user_id, position
            ",
        )
        .bind(author_user_ids)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(recipes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_user_id: Option<i64>,
    /// Matches recipes carrying any of these tag slugs.
    pub tag_slugs: Vec<String>,
    pub search: Option<String>,
    pub only_favorited: bool,
    pub only_in_shopping_cart: bool,
}

/// A recipe plus the flags that depend on who is looking at it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeListing {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeListing {
    fn select(viewer: Option<i64>) -> QueryBuilder<'static, Postgres> {
        let mut query_builder = QueryBuilder::new(
            r"
            SELECT
                r.recipe_id,
                r.author_user_id,
                r.name,
                r.image,
                r.text,
                r.cooking_time,
                r.created_at,
                EXISTS (
                    SELECT 1 FROM favorites f
                    WHERE f.recipe_id = r.recipe_id AND f.user_id = ",
        );
        query_builder.push_bind(viewer);
        query_builder.push(
            r"
                ) AS is_favorited,
                EXISTS (
                    SELECT 1 FROM shopping_cart c
                    WHERE c.recipe_id = r.recipe_id AND c.user_id = ",
        );
        query_builder.push_bind(viewer);
        query_builder.push(
            r"
                ) AS is_in_shopping_cart
            FROM recipes r
            WHERE TRUE",
        );

        query_builder
    }

    pub async fn get(pool: &PgPool, recipe_id: i64, viewer: Option<i64>) -> Result<Option<Self>> {
        let mut query_builder = Self::select(viewer);
        query_builder.push(" AND r.recipe_id = ");
        query_builder.push_bind(recipe_id);

        let listing = query_builder
            .build_query_as::<RecipeListing>()
            .fetch_optional(pool)
            .await?;

        Ok(listing)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn list(
        pool: &PgPool,
        viewer: Option<i64>,
        filter: &RecipeFilter,
    ) -> Result<Vec<Self>> {
        if viewer.is_none() && (filter.only_favorited || filter.only_in_shopping_cart) {
            return Ok(Vec::new());
        }

        let mut query_builder = Self::select(viewer);

        if let Some(author_user_id) = filter.author_user_id {
            query_builder.push(" AND r.author_user_id = ");
            query_builder.push_bind(author_user_id);
        }

        if !filter.tag_slugs.is_empty() {
            query_builder.push(
                r"
                AND EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    JOIN tags t ON t.tag_id = rt.tag_id
                    WHERE rt.recipe_id = r.recipe_id AND t.slug = ANY(",
            );
            query_builder.push_bind(filter.tag_slugs.clone());
            query_builder.push("))");
        }

        if let Some(search) = &filter.search {
            query_builder.push(" AND r.name ILIKE ");
            query_builder.push_bind(contains_pattern(search));
        }

        if filter.only_favorited {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.recipe_id AND f.user_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }

        if filter.only_in_shopping_cart {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.recipe_id AND c.user_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }

        query_builder.push(" ORDER BY r.created_at DESC, r.recipe_id DESC");

        let listings = query_builder
            .build_query_as::<RecipeListing>()
            .fetch_all(pool)
            .await?;

        Ok(listings)
    }
}

/// A recipe with its author, tags and ingredient amounts attached.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub listing: RecipeListing,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

impl RecipeDetails {
    pub async fn get(pool: &PgPool, recipe_id: i64, viewer: Option<i64>) -> Result<Option<Self>> {
        let Some(listing) = RecipeListing::get(pool, recipe_id, viewer).await? else {
            return Ok(None);
        };

        let mut details = Self::load(pool, vec![listing], viewer).await?;

        Ok(details.pop())
    }

    /// Attaches nested data to `listings` with one query per relation,
    /// keeping the listing order.
    pub async fn load(
        pool: &PgPool,
        listings: Vec<RecipeListing>,
        viewer: Option<i64>,
    ) -> Result<Vec<Self>> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let recipe_ids = listings.iter().map(|l| l.recipe.recipe_id).collect_vec();
        let author_ids = listings
            .iter()
            .map(|l| l.recipe.author_user_id)
            .unique()
            .collect_vec();

        let authors: HashMap<i64, UserProfile> =
            UserProfile::get_many(pool, &author_ids, viewer)
                .await?
                .into_iter()
                .map(|profile| (profile.user.user_id, profile))
                .collect();

        let mut tags = RecipeTag::get_by_recipes(pool, &recipe_ids)
            .await?
            .into_iter()
            .map(|rt| (rt.recipe_id, rt.tag))
            .into_group_map();

        let mut ingredients = RecipeIngredient::get_by_recipes(pool, &recipe_ids)
            .await?
            .into_iter()
            .map(|ri| (ri.recipe_id, ri))
            .into_group_map();

        listings
            .into_iter()
            .map(|listing| {
                let recipe_id = listing.recipe.recipe_id;
                let author_id = listing.recipe.author_user_id;
                let author = authors.get(&author_id).cloned().ok_or_else(|| {
                    eyre!("Recipe {recipe_id} references missing author {author_id}")
                })?;

                Ok(Self {
                    listing,
                    author,
                    tags: tags.remove(&recipe_id).unwrap_or_default(),
                    ingredients: ingredients.remove(&recipe_id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cooking::{Ingredient, RecipeCollection},
        users::test::create_user,
    };

    struct Pantry {
        flour: Ingredient,
        eggs: Ingredient,
        milk: Ingredient,
        breakfast: Tag,
        dinner: Tag,
    }

    async fn stock_pantry(pool: &PgPool) -> Pantry {
        Pantry {
            flour: Ingredient::create(pool, "flour", "g").await.unwrap(),
            eggs: Ingredient::create(pool, "eggs", "pcs").await.unwrap(),
            milk: Ingredient::create(pool, "milk", "ml").await.unwrap(),
            breakfast: Tag::create(pool, "Breakfast", "#E26C2D", "breakfast")
                .await
                .unwrap(),
            dinner: Tag::create(pool, "Dinner", "#8775D2", "dinner")
                .await
                .unwrap(),
        }
    }

    fn pancakes(pantry: &Pantry) -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            image: None,
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            ingredients: BTreeMap::from([
                (pantry.flour.ingredient_id, 200),
                (pantry.eggs.ingredient_id, 2),
            ]),
            tags: BTreeSet::from([pantry.breakfast.tag_id]),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_recipe_with_details(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let author = create_user(&pool, "author@example.com").await;

        let recipe = Recipe::create(&pool, author.user_id, &pancakes(&pantry))
            .await
            .unwrap();

        let details = RecipeDetails::get(&pool, recipe.recipe_id, None)
            .await
            .unwrap()
            .expect("recipe should exist");

        assert_eq!(details.author.user.user_id, author.user_id);
        assert!(!details.author.is_subscribed);
        assert_eq!(details.tags, vec![pantry.breakfast.clone()]);
        assert_eq!(
            details
                .ingredients
                .iter()
                .map(|i| (i.name.as_str(), i.amount))
                .collect_vec(),
            vec![("eggs", 2), ("flour", 200)]
        );
        assert!(!details.listing.is_favorited);
        assert!(!details.listing.is_in_shopping_cart);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_reconciles_associations(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let author = create_user(&pool, "author@example.com").await;
        let recipe = Recipe::create(&pool, author.user_id, &pancakes(&pantry))
            .await
            .unwrap();

        let patch = RecipePatch {
            name: Some("Crepes".to_string()),
            ingredients: Some(BTreeMap::from([
                (pantry.flour.ingredient_id, 150),
                (pantry.milk.ingredient_id, 300),
            ])),
            tags: Some(BTreeSet::from([pantry.dinner.tag_id])),
            ..RecipePatch::default()
        };
        let updated = recipe.update(&pool, &patch).await.unwrap();

        assert_eq!(updated.name, "Crepes");
        assert_eq!(updated.text, recipe.text);
        assert_eq!(updated.cooking_time, 20);

        let details = RecipeDetails::get(&pool, recipe.recipe_id, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.tags, vec![pantry.dinner.clone()]);
        assert_eq!(
            details
                .ingredients
                .iter()
                .map(|i| (i.ingredient_id, i.amount))
                .collect::<BTreeMap<_, _>>(),
            BTreeMap::from([
                (pantry.flour.ingredient_id, 150),
                (pantry.milk.ingredient_id, 300),
            ])
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_can_clear_image(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let author = create_user(&pool, "author@example.com").await;
        let draft = RecipeDraft {
            image: Some("data:image/png;base64,AAAA".to_string()),
            ..pancakes(&pantry)
        };
        let recipe = Recipe::create(&pool, author.user_id, &draft).await.unwrap();

        let untouched = recipe.update(&pool, &RecipePatch::default()).await.unwrap();
        assert_eq!(untouched.image, draft.image);

        let cleared = recipe
            .update(
                &pool,
                &RecipePatch {
                    image: Some(None),
                    ..RecipePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.image, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_filters(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let alice = create_user(&pool, "alice@example.com").await;
        let bob = create_user(&pool, "bob@example.com").await;

        let breakfast = Recipe::create(&pool, alice.user_id, &pancakes(&pantry))
            .await
            .unwrap();
        let dinner = Recipe::create(
            &pool,
            bob.user_id,
            &RecipeDraft {
                name: "Omelette".to_string(),
                tags: BTreeSet::from([pantry.dinner.tag_id]),
                ..pancakes(&pantry)
            },
        )
        .await
        .unwrap();

        let ids = |listings: Vec<RecipeListing>| {
            listings.into_iter().map(|l| l.recipe.recipe_id).collect_vec()
        };

        let all = RecipeListing::list(&pool, None, &RecipeFilter::default())
            .await
            .unwrap();
        assert_eq!(ids(all), vec![dinner.recipe_id, breakfast.recipe_id]);

        let by_author = RecipeFilter {
            author_user_id: Some(alice.user_id),
            ..RecipeFilter::default()
        };
        assert_eq!(
            ids(RecipeListing::list(&pool, None, &by_author).await.unwrap()),
            vec![breakfast.recipe_id]
        );

        let by_tags = RecipeFilter {
            tag_slugs: vec!["dinner".to_string(), "brunch".to_string()],
            ..RecipeFilter::default()
        };
        assert_eq!(
            ids(RecipeListing::list(&pool, None, &by_tags).await.unwrap()),
            vec![dinner.recipe_id]
        );

        let by_search = RecipeFilter {
            search: Some("omel".to_string()),
            ..RecipeFilter::default()
        };
        assert_eq!(
            ids(RecipeListing::list(&pool, None, &by_search).await.unwrap()),
            vec![dinner.recipe_id]
        );

        RecipeCollection::Favorites
            .add(&pool, bob.user_id, breakfast.recipe_id)
            .await
            .unwrap();
        let favorited = RecipeFilter {
            only_favorited: true,
            ..RecipeFilter::default()
        };
        let bobs_favorites = RecipeListing::list(&pool, Some(bob.user_id), &favorited)
            .await
            .unwrap();
        assert_eq!(bobs_favorites.len(), 1);
        assert!(bobs_favorites[0].is_favorited);
        assert!(!bobs_favorites[0].is_in_shopping_cart);

        assert!(RecipeListing::list(&pool, Some(alice.user_id), &favorited)
            .await
            .unwrap()
            .is_empty());
        assert!(RecipeListing::list(&pool, None, &favorited)
            .await
            .unwrap()
            .is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_collections_are_unique_per_recipe(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let cook = create_user(&pool, "cook@example.com").await;
        let recipe = Recipe::create(&pool, cook.user_id, &pancakes(&pantry))
            .await
            .unwrap();

        let cart = RecipeCollection::ShoppingCart;
        assert!(cart.add(&pool, cook.user_id, recipe.recipe_id).await.unwrap());
        assert!(!cart.add(&pool, cook.user_id, recipe.recipe_id).await.unwrap());
        assert!(cart
            .contains(&pool, cook.user_id, recipe.recipe_id)
            .await
            .unwrap());
        assert!(!RecipeCollection::Favorites
            .contains(&pool, cook.user_id, recipe.recipe_id)
            .await
            .unwrap());

        assert!(cart.remove(&pool, cook.user_id, recipe.recipe_id).await.unwrap());
        assert!(!cart.remove(&pool, cook.user_id, recipe.recipe_id).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_by_authors_respects_limit(pool: PgPool) {
        let pantry = stock_pantry(&pool).await;
        let author = create_user(&pool, "author@example.com").await;

        for name in ["First", "Second", "Third"] {
            Recipe::create(
                &pool,
                author.user_id,
                &RecipeDraft {
                    name: name.to_string(),
                    ..pancakes(&pantry)
                },
            )
            .await
            .unwrap();
        }

        let limited = RecipeShort::list_by_authors(&pool, &[author.user_id], Some(2))
            .await
            .unwrap();
        assert_eq!(
            limited.iter().map(|r| r.name.as_str()).collect_vec(),
            vec!["Third", "Second"]
        );

        let everything = RecipeShort::list_by_authors(&pool, &[author.user_id], None)
            .await
            .unwrap();
        assert_eq!(everything.len(), 3);
    }
}
