use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Query, WithRejection};
use color_eyre::eyre::{eyre, Context as _};
use db::{
    cooking::{Ingredient, Recipe, RecipeDetails, RecipeFilter, RecipeListing, Tag},
    users::User,
};
use itertools::Itertools as _;
use serde::Deserialize;
use serde_json::Value;

use super::{
    schema::RecipeResponse,
    validation::{check_references, RecipePayload, ValidationErrors},
    IdPath,
};
use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeUser},
        ResponseResult, ServerError, WithStatus as _,
    },
    AppState,
};

/// Parsed as loose JSON so field types are checked by `RecipePayload`, after
/// the 404/403 checks.
type JsonBody = WithRejection<Json<Value>, ServerError>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipeQuery {
    author: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
    is_favorited: Option<String>,
    is_in_shopping_cart: Option<String>,
    search: Option<String>,
}

fn parse_flag(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("" | "0" | "false") => false,
        Some("1" | "true") => true,
        Some(other) => {
            errors.add(
                field,
                format!("Select a valid choice. {other} is not one of the available choices."),
            );
            false
        }
    }
}

impl RecipeQuery {
    fn into_filter(self) -> Result<RecipeFilter, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let only_favorited =
            parse_flag(&mut errors, "is_favorited", self.is_favorited.as_deref());
        let only_in_shopping_cart = parse_flag(
            &mut errors,
            "is_in_shopping_cart",
            self.is_in_shopping_cart.as_deref(),
        );

        let filter = RecipeFilter {
            author_user_id: self.author,
            tag_slugs: self
                .tags
                .into_iter()
                .filter(|slug| !slug.is_empty())
                .unique()
                .collect(),
            search: self.search.filter(|s| !s.is_empty()),
            only_favorited,
            only_in_shopping_cart,
        };

        errors.into_result(filter)
    }
}

/// Rejects ingredient and tag ids that do not exist.
async fn check_payload_references(
    state: &AppState,
    ingredients: Option<&BTreeMap<i64, i32>>,
    tags: Option<&BTreeSet<i64>>,
) -> ResponseResult<()> {
    let ingredient_ids = ingredients
        .map(|i| i.keys().copied().collect_vec())
        .unwrap_or_default();
    let tag_ids = tags.map(|t| t.iter().copied().collect_vec()).unwrap_or_default();

    let known_ingredients = Ingredient::existing_ids(&state.db, &ingredient_ids)
        .await
        .context("Failed to look up ingredients")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;
    let known_tags = Tag::existing_ids(&state.db, &tag_ids)
        .await
        .context("Failed to look up tags")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    check_references(ingredient_ids, &known_ingredients, tag_ids, &known_tags)
        .into_result(())
        .map_err(Into::into)
}

async fn details_for(
    state: &AppState,
    recipe_id: i64,
    viewer: &User,
) -> ResponseResult<RecipeResponse> {
    let details = RecipeDetails::get(&state.db, recipe_id, Some(viewer.user_id))
        .await
        .context("Failed to load recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| eyre!("Recipe {recipe_id} vanished after being written"))?;

    Ok(details.into())
}

/// Fetches a recipe the caller is about to change, enforcing 404 before 403.
async fn editable_recipe(state: &AppState, recipe_id: i64, user: &User) -> ResponseResult<Recipe> {
    let recipe = Recipe::get_by_id(&state.db, recipe_id)
        .await
        .context("Failed to fetch recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    if !recipe.can_be_edited_by(user) {
        return Err(ServerError::forbidden());
    }

    Ok(recipe)
}

#[axum_macros::debug_handler]
pub(crate) async fn list_recipes(
    user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RecipeQuery>, ServerError>,
) -> ResponseResult<Json<Vec<RecipeResponse>>> {
    let filter = query.into_filter()?;
    let viewer = user.user_id();

    let listings = RecipeListing::list(&state.db, viewer, &filter)
        .await
        .context("Failed to list recipes")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    let details = RecipeDetails::load(&state.db, listings, viewer)
        .await
        .context("Failed to load recipe details")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(details.into_iter().map(Into::into).collect()))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_recipe(
    user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<Json<RecipeResponse>> {
    let details = RecipeDetails::get(&state.db, recipe_id, user.user_id())
        .await
        .context("Failed to load recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(details.into()))
}

#[axum_macros::debug_handler]
pub(crate) async fn create_recipe(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody,
) -> ResponseResult<(StatusCode, Json<RecipeResponse>)> {
    let draft = RecipePayload::from_json(body)?.into_draft()?;
    check_payload_references(&state, Some(&draft.ingredients), Some(&draft.tags)).await?;

    let recipe = Recipe::create(&state.db, user.user_id, &draft)
        .await
        .context("Failed to create recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    let response = details_for(&state, recipe.recipe_id, &user).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum_macros::debug_handler]
pub(crate) async fn update_recipe(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
    WithRejection(Json(body), _): JsonBody,
) -> ResponseResult<Json<RecipeResponse>> {
    let recipe = editable_recipe(&state, recipe_id, &user).await?;

    let patch = RecipePayload::from_json(body)?.into_patch()?;
    check_payload_references(&state, patch.ingredients.as_ref(), patch.tags.as_ref()).await?;

    recipe
        .update(&state.db, &patch)
        .await
        .context("Failed to update recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(details_for(&state, recipe_id, &user).await?))
}

#[axum_macros::debug_handler]
pub(crate) async fn delete_recipe(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<StatusCode> {
    let recipe = editable_recipe(&state, recipe_id, &user).await?;

    Recipe::delete(&state.db, recipe.recipe_id)
        .await
        .context("Failed to delete recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(recipe_id, user_id = user.user_id, "Deleted recipe");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_query_into_filter() {
        let query = RecipeQuery {
            author: Some(2),
            tags: vec![
                "breakfast".into(),
                "lunch".into(),
                "breakfast".into(),
                String::new(),
            ],
            is_favorited: Some("1".into()),
            is_in_shopping_cart: Some("0".into()),
            search: Some(String::new()),
        };

        assert_eq!(
            query.into_filter().unwrap(),
            RecipeFilter {
                author_user_id: Some(2),
                tag_slugs: vec!["breakfast".into(), "lunch".into()],
                search: None,
                only_favorited: true,
                only_in_shopping_cart: false,
            }
        );
    }

    #[test]
    fn test_empty_query_is_no_filter() {
        assert_eq!(
            RecipeQuery::default().into_filter().unwrap(),
            RecipeFilter::default()
        );
    }

    #[test]
    fn test_bad_flag_is_rejected() {
        let query = RecipeQuery {
            is_favorited: Some("maybe".into()),
            ..RecipeQuery::default()
        };

        let errors = query.into_filter().unwrap_err();
        assert!(errors.get("is_favorited").is_some());
    }
}
