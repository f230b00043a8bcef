//! CMS mirror endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use cafe_common::DishDraft;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::services::catalog_mirror::{
    create_and_mirror, sync_catalog, CreateOutcome, SyncOptions, SyncReport,
};
use crate::AppState;

/// POST /api/sync/notion request
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Only mirror this page
    #[serde(default, alias = "dishId", alias = "page_id")]
    pub notion_id: Option<String>,
    #[serde(default, alias = "generateKeywords")]
    pub generate_keywords: bool,
}

/// POST /api/sync/notion
pub async fn sync_notion(
    State(state): State<AppState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> ApiResult<Json<SyncReport>> {
    let catalog = state.require_catalog()?;
    let Json(request) = payload?;

    let options = SyncOptions {
        record_id: request.notion_id.filter(|id| !id.trim().is_empty()),
        generate_keywords: request.generate_keywords,
    };
    let report = sync_catalog(&state.db, catalog, &state.generator, &options).await?;
    Ok(Json(report))
}

/// POST /api/cms/dishes
pub async fn create_cms_dish(
    State(state): State<AppState>,
    payload: Result<Json<DishDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateOutcome>)> {
    let catalog = state.require_catalog()?;
    let Json(draft) = payload?;

    let outcome = create_and_mirror(&state.db, catalog, draft).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Build CMS mirror routes
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync/notion", post(sync_notion))
        .route("/api/cms/dishes", post(create_cms_dish))
}
