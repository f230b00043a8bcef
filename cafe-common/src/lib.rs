//! # Café Menu Common Library
//!
//! Shared code for the café menu service including:
//! - Error type
//! - Bootstrap configuration (root folder, TOML file, credentials)
//! - Database schema initialization and the dish model
//! - Keyword list normalization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod keywords;
pub mod models;

pub use error::{Error, Result};
pub use models::{Dish, DishDraft, DishPatch};
