use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Query, WithRejection};
use color_eyre::eyre::Context as _;
use db::cooking::Ingredient;
use serde::Deserialize;

use super::{schema::IngredientResponse, IdPath};
use crate::{
    http_server::{current_user::MaybeUser, ResponseResult, ServerError, WithStatus as _},
    AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct IngredientQuery {
    name: Option<String>,
}

#[axum_macros::debug_handler]
pub(crate) async fn list_ingredients(
    _user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<IngredientQuery>, ServerError>,
) -> ResponseResult<Json<Vec<IngredientResponse>>> {
    let name = query.name.as_deref().filter(|s| !s.is_empty());

    let ingredients = Ingredient::search(&state.db, name)
        .await
        .context("Failed to search ingredients")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_ingredient(
    _user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Path(ingredient_id), _): IdPath,
) -> ResponseResult<Json<IngredientResponse>> {
    let ingredient = Ingredient::get_by_id(&state.db, ingredient_id)
        .await
        .context("Failed to fetch ingredient")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(ingredient.into()))
}
