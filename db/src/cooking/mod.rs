pub mod collections;
pub mod ingredients;
pub mod recipe;
pub mod reconcile;
pub mod shopping_cart;
pub mod tags;

pub use collections::RecipeCollection;
pub use ingredients::{Ingredient, RecipeIngredient};
pub use recipe::{
    Recipe, RecipeDetails, RecipeDraft, RecipeFilter, RecipeListing, RecipePatch, RecipeShort,
};
pub use reconcile::{AmountChanges, SetChanges};
pub use shopping_cart::{CartLine, ShoppingList, ShoppingListItem};
pub use tags::{RecipeTag, Tag};

/// Builds an `ILIKE` pattern matching `needle` anywhere, with the LIKE
/// metacharacters in `needle` taken literally.
pub(crate) fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(needle))
}

pub(crate) fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
