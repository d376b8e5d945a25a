use axum::{
    extract::Path,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;

use super::ServerError;
use crate::AppState;

mod collections;
mod favorites;
mod ingredients;
mod recipes;
pub(crate) mod schema;
mod shopping_cart;
mod subscriptions;
mod tags;
mod users;
pub(crate) mod validation;

/// A numeric id from the URL. Anything else is a 404, as no route matches it.
pub(crate) type IdPath = WithRejection<Path<i64>, ServerError>;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(users::list_users))
        .route("/users/me/", get(users::me))
        .route(
            "/users/subscriptions/",
            get(subscriptions::list_subscriptions),
        )
        .route("/users/{id}/", get(users::get_user))
        .route(
            "/users/{id}/subscribe/",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        .route("/tags/", get(tags::list_tags))
        .route("/tags/{id}/", get(tags::get_tag))
        .route("/ingredients/", get(ingredients::list_ingredients))
        .route("/ingredients/{id}/", get(ingredients::get_ingredient))
        .route(
            "/recipes/",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart/",
            get(shopping_cart::download_shopping_cart),
        )
        .route(
            "/recipes/{id}/",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(shopping_cart::add_to_cart).delete(shopping_cart::remove_from_cart),
        )
}
