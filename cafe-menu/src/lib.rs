//! cafe-menu library interface
//!
//! Exposes the router and services for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{
    CatalogSource, DishMatcher, KeywordExtractor, KeywordGenerator, LabelSource, MatcherConfig,
};

/// Largest accepted request body (base64 photos)
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub extractor: KeywordExtractor,
    pub matcher: DishMatcher,
    pub generator: KeywordGenerator,
    /// CMS the catalog is mirrored from; `None` when not configured
    pub catalog: Option<Arc<dyn CatalogSource>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        label_source: Option<Arc<dyn LabelSource>>,
        catalog: Option<Arc<dyn CatalogSource>>,
        matcher: MatcherConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            db,
            extractor: KeywordExtractor::new(label_source.clone()),
            matcher: DishMatcher::new(matcher),
            generator: KeywordGenerator::new(label_source)?,
            catalog,
            startup_time: Utc::now(),
        })
    }

    /// The configured CMS, or a 400 explaining it is missing
    pub fn require_catalog(&self) -> ApiResult<&dyn CatalogSource> {
        self.catalog.as_deref().ok_or_else(|| {
            ApiError::NotConfigured(
                "Notion credentials are not configured (NOTION_TOKEN, NOTION_DISHES_DATABASE_ID)"
                    .to_string(),
            )
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::analyze_routes())
        .merge(api::dish_routes())
        .merge(api::keyword_routes())
        .merge(api::sync_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
