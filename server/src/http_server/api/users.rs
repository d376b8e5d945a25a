use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use color_eyre::eyre::Context as _;
use db::users::UserProfile;

use super::{schema::UserResponse, IdPath};
use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeUser},
        ResponseResult, ServerError, WithStatus as _,
    },
    AppState,
};

#[axum_macros::debug_handler]
pub(crate) async fn list_users(
    user: MaybeUser,
    State(state): State<AppState>,
) -> ResponseResult<Json<Vec<UserResponse>>> {
    let profiles = UserProfile::list(&state.db, user.user_id())
        .await
        .context("Failed to list users")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_user(
    user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): IdPath,
) -> ResponseResult<Json<UserResponse>> {
    let profile = UserProfile::get(&state.db, user_id, user.user_id())
        .await
        .context("Failed to fetch user")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(profile.into()))
}

/// The caller's own profile. Nobody is subscribed to themselves.
#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn me(CurrentUser(user): CurrentUser) -> ResponseResult<Json<UserResponse>> {
    Ok(Json(UserResponse::new(user, false)))
}
