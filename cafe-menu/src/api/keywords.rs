//! Keyword generation endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::dishes;
use crate::error::{ApiError, ApiResult};
use crate::services::keyword_extractor::decode_image_data;
use crate::services::keyword_generator::{regenerate_catalog_keywords, BulkReport};
use crate::AppState;

/// POST /api/keywords/generate request
///
/// With `dish_id` the dish supplies name and category (unless given) and the
/// generated lists are stored on it.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateKeywordsRequest {
    #[serde(default, alias = "dishId")]
    pub dish_id: Option<Uuid>,
    #[serde(default, alias = "dishName")]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Base64 photo, optionally as a data URL
    #[serde(default, alias = "imageData", alias = "image_data")]
    pub image: Option<String>,
    /// Photo to download when no inline image is given
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// POST /api/keywords/generate response
#[derive(Debug, Serialize)]
pub struct GenerateKeywordsResponse {
    pub keywords: Vec<String>,
    pub visual_keywords: Vec<String>,
    pub confidence: f32,
    pub used_vision: bool,
    pub stored: bool,
}

/// POST /api/keywords/bulk-update request
#[derive(Debug, Default, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/keywords/generate
pub async fn generate_keywords(
    State(state): State<AppState>,
    payload: Result<Json<GenerateKeywordsRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateKeywordsResponse>> {
    let Json(request) = payload?;

    let dish = match request.dish_id {
        Some(id) => Some(
            dishes::get_dish(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Dish {}", id)))?,
        ),
        None => None,
    };

    let name = non_blank(request.name)
        .or_else(|| dish.as_ref().map(|d| d.name.clone()))
        .ok_or_else(|| ApiError::BadRequest("Dish name is required".to_string()))?;
    let category = non_blank(request.category)
        .or_else(|| dish.as_ref().map(|d| d.category.clone()))
        .ok_or_else(|| ApiError::BadRequest("Dish category is required".to_string()))?;

    let generated = match non_blank(request.image) {
        Some(data) => {
            let image = decode_image_data(&data)
                .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image data: {}", e)))?;
            state
                .generator
                .generate(&name, &category, Some(&image))
                .await
        }
        None => {
            let image_url = non_blank(request.image_url)
                .or_else(|| dish.as_ref().and_then(|d| d.image_urls.first().cloned()));
            state
                .generator
                .generate_for_url(&name, &category, image_url.as_deref())
                .await
        }
    };

    let stored = match &dish {
        Some(dish) => {
            dishes::update_keywords(
                &state.db,
                dish.id,
                &generated.keywords,
                &generated.visual_keywords,
            )
            .await?;
            tracing::info!(
                dish_id = %dish.id,
                keywords = generated.keywords.len(),
                "Stored generated keywords"
            );
            true
        }
        None => false,
    };

    Ok(Json(GenerateKeywordsResponse {
        keywords: generated.keywords,
        visual_keywords: generated.visual_keywords,
        confidence: generated.confidence,
        used_vision: generated.used_vision,
        stored,
    }))
}

/// POST /api/keywords/bulk-update
pub async fn bulk_update_keywords(
    State(state): State<AppState>,
    payload: Result<Json<BulkUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<BulkReport>> {
    let Json(request) = payload?;
    let report = regenerate_catalog_keywords(&state.db, &state.generator, request.dry_run).await?;
    Ok(Json(report))
}

/// Build keyword routes
pub fn keyword_routes() -> Router<AppState> {
    Router::new()
        .route("/api/keywords/generate", post(generate_keywords))
        .route("/api/keywords/bulk-update", post(bulk_update_keywords))
}
