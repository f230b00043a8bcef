//! Dish catalog API handlers
//!
//! CRUD over the local store plus keyword search. Deletes also archive the
//! mirrored CMS record when a CMS is configured.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use cafe_common::{Dish, DishDraft, DishPatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::SuggestedDish;
use crate::db::dishes::{self, DishFilter};
use crate::error::{ApiError, ApiResult};
use crate::services::catalog_mirror::{remove_dish, DeleteOutcome, DeleteTarget};
use crate::types::WeightedKeyword;
use crate::AppState;

/// GET /api/dishes query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListDishesQuery {
    pub category: Option<String>,
    pub available: Option<bool>,
}

/// GET /api/dishes response
#[derive(Debug, Serialize)]
pub struct DishListResponse {
    pub dishes: Vec<Dish>,
    pub total: usize,
}

/// POST /api/dishes/search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
}

/// POST /api/dishes/search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub dishes: Vec<SuggestedDish>,
    pub total: usize,
    pub keywords: Vec<String>,
}

/// GET /api/dishes
pub async fn list_dishes(
    State(state): State<AppState>,
    query: Result<Query<ListDishesQuery>, QueryRejection>,
) -> ApiResult<Json<DishListResponse>> {
    let Query(query) = query?;
    let filter = DishFilter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        available: query.available,
    };

    let dishes = dishes::list_dishes(&state.db, &filter).await?;
    Ok(Json(DishListResponse {
        total: dishes.len(),
        dishes,
    }))
}

/// POST /api/dishes
pub async fn create_dish(
    State(state): State<AppState>,
    payload: Result<Json<DishDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Dish>)> {
    let Json(draft) = payload?;
    let draft = draft.normalized();
    draft.validate()?;

    if let Some(notion_id) = &draft.notion_id {
        if dishes::get_dish_by_notion_id(&state.db, notion_id).await?.is_some() {
            return Err(ApiError::BadRequest(format!(
                "A dish mirrored from CMS record {} already exists",
                notion_id
            )));
        }
    }

    let dish = draft.into_dish();
    dishes::insert_dish(&state.db, &dish).await?;
    tracing::info!(dish_id = %dish.id, name = %dish.name, "Created dish");

    Ok((StatusCode::CREATED, Json(dish)))
}

/// GET /api/dishes/:id
pub async fn get_dish(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Dish>> {
    let Path(id) = id?;
    let dish = dishes::get_dish(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dish {}", id)))?;
    Ok(Json(dish))
}

/// PUT /api/dishes/:id (partial update)
pub async fn update_dish(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DishPatch>, JsonRejection>,
) -> ApiResult<Json<Dish>> {
    let Path(id) = id?;
    let Json(patch) = payload?;

    let mut dish = dishes::get_dish(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dish {}", id)))?;
    patch.apply_to(&mut dish)?;
    dishes::update_dish(&state.db, &dish).await?;

    tracing::info!(dish_id = %dish.id, "Updated dish");
    Ok(Json(dish))
}

/// DELETE /api/dishes/:id
pub async fn delete_dish(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<DeleteOutcome>> {
    let Path(id) = id?;
    let outcome = remove_dish(&state.db, state.catalog.as_deref(), DeleteTarget::Id(id)).await?;
    Ok(Json(outcome))
}

/// DELETE /api/dishes/notion/:notion_id
pub async fn delete_dish_by_notion_id(
    State(state): State<AppState>,
    notion_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<DeleteOutcome>> {
    let Path(notion_id) = notion_id?;
    let outcome = remove_dish(
        &state.db,
        state.catalog.as_deref(),
        DeleteTarget::ExternalId(notion_id),
    )
    .await?;
    Ok(Json(outcome))
}

/// POST /api/dishes/search
///
/// Exact matching only; no category or popular fallback.
pub async fn search_dishes(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(request) = payload?;
    let keywords = cafe_common::keywords::normalize_keywords(&request.keywords);
    if keywords.is_empty() {
        return Err(ApiError::BadRequest("At least one keyword is required".to_string()));
    }

    let weighted: Vec<WeightedKeyword> = keywords.iter().map(WeightedKeyword::query).collect();
    let catalog = dishes::list_dishes(
        &state.db,
        &DishFilter {
            category: None,
            available: Some(true),
        },
    )
    .await?;

    let dishes: Vec<SuggestedDish> = state
        .matcher
        .rank(&catalog, &weighted)
        .into_iter()
        .map(SuggestedDish::from)
        .collect();

    tracing::debug!(keywords = ?keywords, results = dishes.len(), "Searched dishes");

    Ok(Json(SearchResponse {
        total: dishes.len(),
        dishes,
        keywords,
    }))
}

/// Build dish catalog routes
pub fn dish_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dishes", get(list_dishes).post(create_dish))
        .route("/api/dishes/search", post(search_dishes))
        .route(
            "/api/dishes/:id",
            get(get_dish).put(update_dish).delete(delete_dish),
        )
        .route("/api/dishes/notion/:notion_id", delete(delete_dish_by_notion_id))
}
