//! JSON shapes returned by the API.

use db::{
    cooking::{Ingredient, RecipeDetails, RecipeIngredient, RecipeShort, Tag},
    subscriptions::SubscribedAuthor,
    users::{User, UserProfile},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TagResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.tag_id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub(crate) fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self::new(profile.user, profile.is_subscribed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(ingredient: RecipeIngredient) -> Self {
        Self {
            id: ingredient.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount: ingredient.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeDetails> for RecipeResponse {
    fn from(details: RecipeDetails) -> Self {
        let RecipeDetails {
            listing,
            author,
            tags,
            ingredients,
        } = details;
        let recipe = listing.recipe;

        Self {
            id: recipe.recipe_id,
            tags: tags.into_iter().map(Into::into).collect(),
            author: author.into(),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            is_favorited: listing.is_favorited,
            is_in_shopping_cart: listing.is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<RecipeShort> for RecipeShortResponse {
    fn from(recipe: RecipeShort) -> Self {
        Self {
            id: recipe.recipe_id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author. Always `is_subscribed: true` from the follower's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: i64,
}

impl SubscriptionResponse {
    pub(crate) fn new(author: SubscribedAuthor, recipes: Vec<RecipeShort>) -> Self {
        Self {
            user: UserResponse::new(author.author, true),
            recipes: recipes.into_iter().map(Into::into).collect(),
            recipes_count: author.recipes_count,
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use db::users::UserRole;
    use serde_json::json;

    use super::*;

    fn user() -> User {
        User {
            user_id: 3,
            email: "vpupkin@yandex.ru".to_string(),
            username: "vasya.pupkin".to_string(),
            first_name: "Vasya".to_string(),
            last_name: "Pupkin".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_shape_hides_internal_fields() {
        let value = serde_json::to_value(UserResponse::new(user(), false)).unwrap();

        assert_eq!(
            value,
            json!({
                "email": "vpupkin@yandex.ru",
                "id": 3,
                "username": "vasya.pupkin",
                "first_name": "Vasya",
                "last_name": "Pupkin",
                "is_subscribed": false
            })
        );
    }

    #[test]
    fn test_subscription_shape_is_flat() {
        let author = SubscribedAuthor {
            author: user(),
            recipes_count: 4,
        };
        let recipes = vec![RecipeShort {
            recipe_id: 10,
            author_user_id: 3,
            name: "Pancakes".to_string(),
            image: None,
            cooking_time: 20,
        }];

        let value = serde_json::to_value(SubscriptionResponse::new(author, recipes)).unwrap();

        assert_eq!(value["id"], json!(3));
        assert_eq!(value["is_subscribed"], json!(true));
        assert_eq!(value["recipes_count"], json!(4));
        assert_eq!(
            value["recipes"],
            json!([{ "id": 10, "name": "Pancakes", "image": null, "cooking_time": 20 }])
        );
        assert!(value.get("user").is_none());
    }
}
