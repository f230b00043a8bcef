//! Database access for cafe-menu

pub mod dishes;
pub mod seed;

pub use dishes::DishFilter;
