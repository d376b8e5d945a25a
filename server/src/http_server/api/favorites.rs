use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use db::cooking::RecipeCollection;

use super::{
    collections::{add_recipe, remove_recipe, CollectionMessages},
    schema::RecipeShortResponse,
    IdPath,
};
use crate::{
    http_server::{current_user::CurrentUser, ResponseResult},
    AppState,
};

const MESSAGES: CollectionMessages = CollectionMessages {
    already_added: "Recipe is already in favorites.",
    not_added: "Recipe is not in favorites.",
};

#[axum_macros::debug_handler]
pub(crate) async fn add_favorite(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<(StatusCode, Json<RecipeShortResponse>)> {
    add_recipe(&state, RecipeCollection::Favorites, &MESSAGES, &user, recipe_id).await
}

#[axum_macros::debug_handler]
pub(crate) async fn remove_favorite(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<StatusCode> {
    remove_recipe(&state, RecipeCollection::Favorites, &MESSAGES, &user, recipe_id).await
}
