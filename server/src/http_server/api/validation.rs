//! Per-field validation of recipe payloads. Errors are collected rather than
//! returned on the first failure, keyed by field name.
//!
//! Payload fields are taken as raw JSON so that wrong types are reported per
//! field along with every other problem, instead of failing deserialization.

use std::collections::{BTreeMap, BTreeSet};

use db::cooking::{RecipeDraft, RecipePatch};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub(crate) const NAME_MAX_CHARS: usize = 200;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub(crate) fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Body of `POST /recipes/` and `PATCH /recipes/{id}/`.
///
/// `None` means the key was absent; an explicit `null` arrives as
/// `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RecipePayload {
    #[serde(default, deserialize_with = "present")]
    pub ingredients: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub text: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub cooking_time: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn check_present(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    required: bool,
) -> Option<Value> {
    match value {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(Value::Null) => {
            errors.add(field, NOT_NULL);
            None
        }
        Some(value) => Some(value),
    }
}

fn check_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    max_chars: Option<usize>,
    required: bool,
) -> Option<String> {
    let value = match check_present(errors, field, value, required)? {
        Value::String(value) => value,
        _ => {
            errors.add(field, NOT_A_STRING);
            return None;
        }
    };
    let trimmed = value.trim();

    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }

    if let Some(max) = max_chars {
        if trimmed.chars().count() > max {
            errors.add(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
            return None;
        }
    }

    Some(trimmed.to_string())
}

/// Accepts JSON integers and integer strings in `1..=i32::MAX`.
fn check_positive(errors: &mut ValidationErrors, field: &str, value: &Value) -> Option<i32> {
    let parsed = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    let Some(parsed) = parsed else {
        errors.add(field, NOT_AN_INTEGER);
        return None;
    };

    if parsed < 1 {
        errors.add(field, "Ensure this value is greater than or equal to 1.");
        return None;
    }

    if let Ok(value) = i32::try_from(parsed) {
        Some(value)
    } else {
        errors.add(
            field,
            format!("Ensure this value is less than or equal to {}.", i32::MAX),
        );
        None
    }
}

fn check_id(errors: &mut ValidationErrors, field: &str, value: &Value) -> Option<i64> {
    let id = value.as_i64();

    if id.is_none() {
        errors.add(
            field,
            format!(
                "Incorrect type. Expected pk value, received {}.",
                type_name(value)
            ),
        );
    }

    id
}

fn expect_list(errors: &mut ValidationErrors, field: &str, value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        other => {
            errors.add(
                field,
                format!(
                    "Expected a list of items but got type \"{}\".",
                    type_name(&other)
                ),
            );
            None
        }
    }
}

fn check_ingredient(
    errors: &mut ValidationErrors,
    index: usize,
    item: Value,
) -> Option<(i64, i32)> {
    let Value::Object(mut item) = item else {
        errors.add(
            format!("ingredients[{index}]"),
            "Invalid data. Expected a dictionary.",
        );
        return None;
    };

    let id_field = format!("ingredients[{index}].id");
    let id = check_present(errors, &id_field, item.remove("id"), true)
        .and_then(|value| check_id(errors, &id_field, &value));

    let amount_field = format!("ingredients[{index}].amount");
    let amount = check_present(errors, &amount_field, item.remove("amount"), true)
        .and_then(|value| check_positive(errors, &amount_field, &value));

    Some((id?, amount?))
}

fn check_ingredients(
    errors: &mut ValidationErrors,
    value: Option<Value>,
    required: bool,
) -> Option<BTreeMap<i64, i32>> {
    let value = check_present(errors, "ingredients", value, required)?;
    let items = expect_list(errors, "ingredients", value)?;

    if items.is_empty() {
        errors.add("ingredients", "Add at least one ingredient.");
        return None;
    }

    let mut amounts = BTreeMap::new();
    let mut repeated = false;
    let mut valid = true;

    for (index, item) in items.into_iter().enumerate() {
        match check_ingredient(errors, index, item) {
            Some((id, amount)) => repeated |= amounts.insert(id, amount).is_some(),
            None => valid = false,
        }
    }

    if repeated {
        errors.add("ingredients", "Ingredients must not repeat.");
    }

    (valid && !repeated).then_some(amounts)
}

fn check_tags(
    errors: &mut ValidationErrors,
    value: Option<Value>,
    required: bool,
) -> Option<BTreeSet<i64>> {
    let value = check_present(errors, "tags", value, required)?;
    let items = expect_list(errors, "tags", value)?;
    let count = items.len();

    let ids: Vec<i64> = items
        .iter()
        .filter_map(|item| check_id(errors, "tags", item))
        .collect();
    if ids.len() != count {
        return None;
    }

    let unique: BTreeSet<i64> = ids.into_iter().collect();
    if unique.len() != count {
        errors.add("tags", "Tags must not repeat.");
        return None;
    }

    Some(unique)
}

/// `None` leaves the image alone, `Some(None)` clears it.
fn check_image(errors: &mut ValidationErrors, value: Option<Value>) -> Option<Option<String>> {
    match value? {
        Value::Null => Some(None),
        Value::String(image) => Some(Some(image)),
        _ => {
            errors.add("image", NOT_A_STRING);
            None
        }
    }
}

impl RecipePayload {
    /// Reads the payload from any JSON body. Only a non-object body is an
    /// error here; field problems are reported by `into_draft`/`into_patch`.
    pub(crate) fn from_json(body: Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !body.is_object() {
            errors.add(
                "non_field_errors",
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    type_name(&body)
                ),
            );
            return Err(errors);
        }

        serde_json::from_value(body).map_err(|err| {
            errors.add("non_field_errors", err.to_string());
            errors
        })
    }

    fn check(self, required: bool) -> Result<RecipePatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let patch = RecipePatch {
            name: check_text(&mut errors, "name", self.name, Some(NAME_MAX_CHARS), required),
            text: check_text(&mut errors, "text", self.text, None, required),
            cooking_time: check_present(&mut errors, "cooking_time", self.cooking_time, required)
                .and_then(|value| check_positive(&mut errors, "cooking_time", &value)),
            ingredients: check_ingredients(&mut errors, self.ingredients, required),
            tags: check_tags(&mut errors, self.tags, required),
            image: check_image(&mut errors, self.image),
        };

        errors.into_result(patch)
    }

    /// Validates a full payload for creating a recipe.
    pub(crate) fn into_draft(self) -> Result<RecipeDraft, ValidationErrors> {
        let patch = self.check(true)?;

        match patch {
            RecipePatch {
                name: Some(name),
                text: Some(text),
                cooking_time: Some(cooking_time),
                ingredients: Some(ingredients),
                tags: Some(tags),
                image,
            } => Ok(RecipeDraft {
                name,
                image: image.flatten(),
                text,
                cooking_time,
                ingredients,
                tags,
            }),
            _ => {
                let mut errors = ValidationErrors::default();
                errors.add("non_field_errors", "Incomplete recipe.");
                Err(errors)
            }
        }
    }

    /// Validates a partial payload; only the fields present are checked.
    pub(crate) fn into_patch(self) -> Result<RecipePatch, ValidationErrors> {
        self.check(false)
    }
}

/// Reports ids in the payload that do not refer to stored rows.
pub(crate) fn check_references(
    ingredient_ids: impl IntoIterator<Item = i64>,
    known_ingredients: &BTreeSet<i64>,
    tag_ids: impl IntoIterator<Item = i64>,
    known_tags: &BTreeSet<i64>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for id in ingredient_ids {
        if !known_ingredients.contains(&id) {
            errors.add("ingredients", format!("Ingredient {id} does not exist."));
        }
    }

    for id in tag_ids {
        if !known_tags.contains(&id) {
            errors.add("tags", format!("Tag {id} does not exist."));
        }
    }

    errors
}
