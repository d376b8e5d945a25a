use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Query, WithRejection};
use color_eyre::eyre::Context as _;
use db::{
    cooking::RecipeShort,
    subscriptions::{SubscribedAuthor, Subscription},
    users::User,
};
use itertools::Itertools as _;
use serde::Deserialize;

use super::{schema::SubscriptionResponse, IdPath};
use crate::{
    http_server::{current_user::CurrentUser, ResponseResult, ServerError, WithStatus as _},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipesLimitQuery {
    recipes_limit: Option<u32>,
}

impl RecipesLimitQuery {
    fn limit(&self) -> Option<i64> {
        self.recipes_limit.map(i64::from)
    }
}

/// Pairs each author with their newest recipes, keeping the author order.
async fn with_recipes(
    state: &AppState,
    authors: Vec<SubscribedAuthor>,
    limit: Option<i64>,
) -> ResponseResult<Vec<SubscriptionResponse>> {
    let author_ids = authors.iter().map(|a| a.author.user_id).collect_vec();

    let mut recipes = RecipeShort::list_by_authors(&state.db, &author_ids, limit)
        .await
        .context("Failed to fetch subscribed authors' recipes")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|recipe| (recipe.author_user_id, recipe))
        .into_group_map();

    Ok(authors
        .into_iter()
        .map(|author| {
            let recipes = recipes.remove(&author.author.user_id).unwrap_or_default();
            SubscriptionResponse::new(author, recipes)
        })
        .collect())
}

#[axum_macros::debug_handler]
pub(crate) async fn list_subscriptions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RecipesLimitQuery>, ServerError>,
) -> ResponseResult<Json<Vec<SubscriptionResponse>>> {
    let authors = SubscribedAuthor::list_for_user(&state.db, user.user_id)
        .await
        .context("Failed to list subscriptions")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(with_recipes(&state, authors, query.limit()).await?))
}

#[axum_macros::debug_handler]
pub(crate) async fn subscribe(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(author_user_id), _): IdPath,
    WithRejection(Query(query), _): WithRejection<Query<RecipesLimitQuery>, ServerError>,
) -> ResponseResult<(StatusCode, Json<SubscriptionResponse>)> {
    let author = SubscribedAuthor::get(&state.db, author_user_id)
        .await
        .context("Failed to fetch author")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    if author.author.user_id == user.user_id {
        return Err(ServerError::bad_request("You cannot subscribe to yourself."));
    }

    let created = Subscription::create(&state.db, user.user_id, author_user_id)
        .await
        .context("Failed to create subscription")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !created {
        return Err(ServerError::bad_request(
            "You are already subscribed to this author.",
        ));
    }

    let mut response = with_recipes(&state, vec![author], query.limit()).await?;
    let response = response
        .pop()
        .ok_or_else(|| color_eyre::eyre::eyre!("Subscription response went missing"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum_macros::debug_handler]
pub(crate) async fn unsubscribe(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(author_user_id), _): IdPath,
) -> ResponseResult<StatusCode> {
    User::get_by_id(&state.db, author_user_id)
        .await
        .context("Failed to fetch author")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    let deleted = Subscription::delete(&state.db, user.user_id, author_user_id)
        .await
        .context("Failed to delete subscription")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !deleted {
        return Err(ServerError::bad_request(
            "You are not subscribed to this author.",
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
