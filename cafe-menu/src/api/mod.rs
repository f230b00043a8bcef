//! HTTP API handlers for cafe-menu

pub mod analyze;
pub mod dishes;
pub mod health;
pub mod keywords;
pub mod sync;

pub use analyze::analyze_routes;
pub use dishes::dish_routes;
pub use health::health_routes;
pub use keywords::keyword_routes;
pub use sync::sync_routes;

use cafe_common::Dish;
use serde::Serialize;

use crate::services::dish_matcher::ScoredDish;

/// A dish with its match score, as returned by analysis and search
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedDish {
    #[serde(flatten)]
    pub dish: Dish,
    pub score: f32,
}

impl From<ScoredDish> for SuggestedDish {
    fn from(scored: ScoredDish) -> Self {
        Self {
            dish: scored.dish,
            score: scored.score,
        }
    }
}
