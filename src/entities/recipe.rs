//! Recipe entity type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::identity::RecipeId;
use crate::core::quantity::{self, parse_quantity, ScaledQuantity, Servings, Unit};

/// Default display glyph for new recipes
pub const DEFAULT_EMOJI: &str = "🍳";

/// Default presentation tag for new recipes
pub const DEFAULT_COLOR: &str = "bg-orange-100";

/// One line item of a recipe
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ingredient {
    /// Quantity text (may be empty or descriptive)
    #[serde(default, deserialize_with = "quantity_text")]
    pub quantity: String,

    /// Unit label
    #[serde(default)]
    pub unit: Unit,

    /// Ingredient name
    pub name: String,
}

impl Ingredient {
    /// Create an ingredient line
    pub fn new(quantity: impl Into<String>, unit: Unit, name: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            unit,
            name: name.into(),
        }
    }

    /// Parse an ingredient from a one-line spec
    ///
    /// Accepted shapes: `"500 g farine"`, `"500g farine"`, `"2 oeufs"`,
    /// `"sel"`. A leading token is taken as the quantity only if it starts
    /// with a number; a unit is recognised only among the fixed authoring
    /// units.
    pub fn from_spec(spec: &str) -> Result<Self, IngredientSpecError> {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        let Some((first, rest)) = tokens.split_first() else {
            return Err(IngredientSpecError::Empty);
        };

        if parse_quantity(first).is_none() {
            return Ok(Self::new("", Unit::None, tokens.join(" ")));
        }

        // "500g" - quantity glued to a known unit
        let (quantity, glued_unit) = split_glued_unit(first);
        let (unit, name_tokens) = match glued_unit {
            Some(unit) => (unit, rest),
            None => match rest.split_first() {
                Some((candidate, tail)) if !tail.is_empty() => {
                    let unit = Unit::from_label(candidate);
                    if unit.is_known() {
                        (unit, tail)
                    } else {
                        (Unit::None, rest)
                    }
                }
                _ => (Unit::None, rest),
            },
        };

        if name_tokens.is_empty() {
            return Err(IngredientSpecError::MissingName(spec.to_string()));
        }

        Ok(Self::new(quantity, unit, name_tokens.join(" ")))
    }

    /// Quantity rescaled from `base` to `target` servings
    pub fn scaled(&self, base: Servings, target: Servings) -> ScaledQuantity {
        quantity::scale(&self.quantity, base, target)
    }
}

fn split_glued_unit(token: &str) -> (String, Option<Unit>) {
    let split_at = token
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| i);

    if let Some(i) = split_at {
        let (number, label) = token.split_at(i);
        let unit = Unit::from_label(label);
        if unit.is_known() && parse_quantity(number).is_some() {
            return (number.to_string(), Some(unit));
        }
    }
    (token.to_string(), None)
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [self.quantity.as_str(), self.unit.as_str(), self.name.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Errors from parsing an ingredient spec
#[derive(Debug, Error)]
pub enum IngredientSpecError {
    #[error("ingredient spec is empty")]
    Empty,

    #[error("ingredient spec '{0}' has no name")]
    MissingName(String),
}

/// Everything about a recipe except its identity and creation time
///
/// This is what authoring produces and what the store's `add` and `update`
/// accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeFields {
    /// Dish name
    pub title: String,

    /// Serving count the ingredient quantities are calibrated for
    #[serde(rename = "baseServings", default)]
    pub base_servings: Servings,

    /// Display glyph
    #[serde(default = "default_emoji")]
    pub emoji: String,

    /// Ingredient lines, in display order
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,

    /// Preparation steps, in order
    #[serde(default)]
    pub steps: Vec<String>,

    /// Presentation tag
    #[serde(default = "default_color")]
    pub color: String,

    /// Free-form grouping label
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
}

fn default_emoji() -> String {
    DEFAULT_EMOJI.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Quantities are text, but older records stored bare numbers
fn quantity_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct QuantityVisitor;

    impl serde::de::Visitor<'_> for QuantityVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a quantity as text or number")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(QuantityVisitor)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_category(value))
}

/// Trim a category label; blank labels mean "no category"
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

impl RecipeFields {
    /// Create fields with defaults for everything but the title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            base_servings: Servings::default(),
            emoji: default_emoji(),
            ingredients: Vec::new(),
            steps: Vec::new(),
            color: default_color(),
            category: None,
        }
    }

    pub fn with_servings(mut self, servings: Servings) -> Self {
        self.base_servings = servings;
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = normalize_category(category);
        self
    }

    /// Prepare fields for saving: ingredients take their display order
    pub fn sorted_for_save(mut self) -> Self {
        self.ingredients = quantity::sort(&self.ingredients);
        self
    }
}

/// A saved recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier
    pub id: RecipeId,

    /// Dish name
    pub title: String,

    /// Serving count the ingredient quantities are calibrated for
    #[serde(rename = "baseServings", default)]
    pub base_servings: Servings,

    /// Display glyph
    #[serde(default = "default_emoji")]
    pub emoji: String,

    /// Ingredient lines, in display order
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,

    /// Preparation steps, in order
    #[serde(default)]
    pub steps: Vec<String>,

    /// Presentation tag
    #[serde(default = "default_color")]
    pub color: String,

    /// Free-form grouping label
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    /// Creation timestamp (epoch milliseconds on the wire)
    #[serde(
        rename = "created_at",
        alias = "createdAt",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Create a recipe with a fresh id, stamped now
    #[cfg(test)]
    pub fn new(fields: RecipeFields) -> Self {
        Self::from_fields(RecipeId::new(), fields, Utc::now())
    }

    /// Assemble a recipe from its parts
    pub fn from_fields(id: RecipeId, fields: RecipeFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            base_servings: fields.base_servings,
            emoji: fields.emoji,
            ingredients: fields.ingredients,
            steps: fields.steps,
            color: fields.color,
            category: normalize_category(fields.category),
            created_at,
        }
    }

    /// The editable part of this recipe
    pub fn fields(&self) -> RecipeFields {
        RecipeFields {
            title: self.title.clone(),
            base_servings: self.base_servings,
            emoji: self.emoji.clone(),
            ingredients: self.ingredients.clone(),
            steps: self.steps.clone(),
            color: self.color.clone(),
            category: self.category.clone(),
        }
    }

    /// The merged record after an edit: new field values, same identity and
    /// creation time
    pub fn merged(&self, fields: RecipeFields) -> Self {
        Self::from_fields(self.id.clone(), fields, self.created_at)
    }

    /// Category label, if any
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Ingredient lines with quantities rescaled to `target` servings
    pub fn scaled_ingredients(&self, target: Servings) -> Vec<(ScaledQuantity, &Ingredient)> {
        self.ingredients
            .iter()
            .map(|ing| (ing.scaled(self.base_servings, target), ing))
            .collect()
    }
}
