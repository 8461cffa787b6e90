//! Larder: a personal recipe book
//!
//! Recipes live in a durable collection and are mirrored by an in-memory
//! store that applies every change locally before the collection confirms
//! it. Ingredient quantities are free text; the quantity module orders them
//! and rescales them to any number of servings.

pub mod cli;
pub mod core;
pub mod entities;
