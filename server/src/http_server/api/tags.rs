use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Query, WithRejection};
use color_eyre::eyre::Context as _;
use db::cooking::Tag;
use serde::Deserialize;

use super::{schema::TagResponse, IdPath};
use crate::{
    http_server::{current_user::MaybeUser, ResponseResult, ServerError, WithStatus as _},
    AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct TagQuery {
    search: Option<String>,
}

#[axum_macros::debug_handler]
pub(crate) async fn list_tags(
    _user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TagQuery>, ServerError>,
) -> ResponseResult<Json<Vec<TagResponse>>> {
    let search = query.search.as_deref().filter(|s| !s.is_empty());

    let tags = Tag::list(&state.db, search)
        .await
        .context("Failed to list tags")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_tag(
    _user: MaybeUser,
    State(state): State<AppState>,
    WithRejection(Path(tag_id), _): IdPath,
) -> ResponseResult<Json<TagResponse>> {
    let tag = Tag::get_by_id(&state.db, tag_id)
        .await
        .context("Failed to fetch tag")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(tag.into()))
}
