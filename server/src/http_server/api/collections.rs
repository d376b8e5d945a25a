//! Shared handling for the per-user recipe lists (favorites and the cart).

use axum::{http::StatusCode, Json};
use color_eyre::eyre::Context as _;
use db::{
    cooking::{Recipe, RecipeCollection, RecipeShort},
    users::User,
};

use super::schema::RecipeShortResponse;
use crate::{
    http_server::{ResponseResult, ServerError, WithStatus as _},
    AppState,
};

/// Caller-facing messages for one collection.
pub(crate) struct CollectionMessages {
    pub already_added: &'static str,
    pub not_added: &'static str,
}

async fn find_recipe(state: &AppState, recipe_id: i64) -> ResponseResult<Recipe> {
    Recipe::get_by_id(&state.db, recipe_id)
        .await
        .context("Failed to fetch recipe")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)
}

pub(crate) async fn add_recipe(
    state: &AppState,
    collection: RecipeCollection,
    messages: &CollectionMessages,
    user: &User,
    recipe_id: i64,
) -> ResponseResult<(StatusCode, Json<RecipeShortResponse>)> {
    let recipe = find_recipe(state, recipe_id).await?;

    let added = collection
        .add(&state.db, user.user_id, recipe.recipe_id)
        .await
        .context("Failed to add recipe to collection")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !added {
        return Err(ServerError::bad_request(messages.already_added));
    }

    Ok((
        StatusCode::CREATED,
        Json(RecipeShort::from(recipe).into()),
    ))
}

pub(crate) async fn remove_recipe(
    state: &AppState,
    collection: RecipeCollection,
    messages: &CollectionMessages,
    user: &User,
    recipe_id: i64,
) -> ResponseResult<StatusCode> {
    let recipe = find_recipe(state, recipe_id).await?;

    let removed = collection
        .remove(&state.db, user.user_id, recipe.recipe_id)
        .await
        .context("Failed to remove recipe from collection")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !removed {
        return Err(ServerError::bad_request(messages.not_added));
    }

    Ok(StatusCode::NO_CONTENT)
}
