use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use color_eyre::eyre::Context as _;
use db::cooking::{RecipeCollection, ShoppingList};
use itertools::Itertools as _;

use super::{
    collections::{add_recipe, remove_recipe, CollectionMessages},
    schema::RecipeShortResponse,
    IdPath,
};
use crate::{
    http_server::{current_user::CurrentUser, ResponseResult, WithStatus as _},
    AppState,
};

const MESSAGES: CollectionMessages = CollectionMessages {
    already_added: "Recipe is already in the shopping cart.",
    not_added: "Recipe is not in the shopping cart.",
};

const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

#[axum_macros::debug_handler]
pub(crate) async fn add_to_cart(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<(StatusCode, Json<RecipeShortResponse>)> {
    add_recipe(
        &state,
        RecipeCollection::ShoppingCart,
        &MESSAGES,
        &user,
        recipe_id,
    )
    .await
}

#[axum_macros::debug_handler]
pub(crate) async fn remove_from_cart(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    WithRejection(Path(recipe_id), _): IdPath,
) -> ResponseResult<StatusCode> {
    remove_recipe(
        &state,
        RecipeCollection::ShoppingCart,
        &MESSAGES,
        &user,
        recipe_id,
    )
    .await
}

/// Renders the list as the plain-text file handed to the caller.
pub(crate) fn render_shopping_list(list: &ShoppingList) -> String {
    let body = if list.is_empty() {
        "Your shopping cart is empty.".to_string()
    } else {
        list.items
            .iter()
            .map(|item| format!("{} ({}) - {}", item.name, item.measurement_unit, item.total))
            .join("\n")
    };

    format!("Shopping list\n\n{body}\n")
}

#[axum_macros::debug_handler]
pub(crate) async fn download_shopping_cart(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<impl IntoResponse> {
    let list = ShoppingList::for_user(&state.db, user.user_id)
        .await
        .context("Failed to build shopping list")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(
        user_id = user.user_id,
        items = list.items.len(),
        "Rendering shopping list"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ),
        ],
        render_shopping_list(&list),
    ))
}

#[cfg(test)]
mod test {
    use db::cooking::CartLine;

    use super::*;

    fn line(recipe_id: i64, ingredient_id: i64, name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            recipe_id,
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn test_render_sums_across_recipes() {
        let list = ShoppingList::aggregate([
            line(1, 2, "Salt", "pinch", 1),
            line(1, 1, "Flour", "g", 500),
            line(2, 1, "Flour", "g", 200),
            line(2, 2, "Salt", "pinch", 1),
        ]);

        assert_eq!(
            render_shopping_list(&list),
            "Shopping list\n\nFlour (g) - 700\nSalt (pinch) - 2\n"
        );
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(
            render_shopping_list(&ShoppingList::default()),
            "Shopping list\n\nYour shopping cart is empty.\n"
        );
    }
}
