//! Entity type definitions
//!
//! - [`Recipe`] - a saved dish with ingredients, steps and serving count
//! - [`RecipeFields`] - the editable part of a recipe (no id, no timestamp)
//! - [`Ingredient`] - one quantity/unit/name line

pub mod recipe;

pub use recipe::{Ingredient, IngredientSpecError, Recipe, RecipeFields};
