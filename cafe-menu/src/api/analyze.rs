//! Photo analysis endpoint
//!
//! POST /api/analyze: extract keywords from a photo and suggest dishes.
//! Never fails because the labeling service is down; the extractor falls
//! back to a canned guess instead.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::api::SuggestedDish;
use crate::db::dishes::{self, DishFilter};
use crate::error::{ApiError, ApiResult};
use crate::services::dish_matcher::MatchTier;
use crate::services::keyword_extractor::decode_image_data;
use crate::types::DetectedLabel;
use crate::AppState;

/// POST /api/analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 image, optionally as a `data:image/...;base64,` URL
    #[serde(alias = "imageData", alias = "image_data")]
    pub image: String,
}

/// POST /api/analyze response
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub detected_items: Vec<String>,
    pub labels: Vec<DetectedLabel>,
    pub confidence: f32,
    pub dishes: Vec<SuggestedDish>,
    pub using_vision_api: bool,
    pub match_tier: MatchTier,
    pub analysis_time_ms: u64,
}

/// POST /api/analyze
pub async fn analyze_image(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResult>> {
    let Json(request) = payload?;
    let started = Instant::now();

    if request.image.trim().is_empty() {
        return Err(ApiError::BadRequest("Image data is required".to_string()));
    }
    let image = decode_image_data(&request.image)
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image data: {}", e)))?;
    if image.is_empty() {
        return Err(ApiError::BadRequest("Image data is empty".to_string()));
    }

    let extraction = state.extractor.extract(&image).await;

    let catalog = dishes::list_dishes(
        &state.db,
        &DishFilter {
            category: None,
            available: Some(true),
        },
    )
    .await?;
    let outcome = state.matcher.match_dishes(&catalog, &extraction.keywords);

    let analysis_time_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        image_bytes = image.len(),
        keywords = extraction.keywords.len(),
        dishes = outcome.dishes.len(),
        tier = ?outcome.tier,
        using_vision_api = extraction.using_vision_api,
        analysis_time_ms,
        "Analyzed image"
    );

    Ok(Json(AnalysisResult {
        detected_items: extraction.detected_items(),
        labels: extraction.labels,
        confidence: extraction.confidence,
        dishes: outcome.dishes.into_iter().map(SuggestedDish::from).collect(),
        using_vision_api: extraction.using_vision_api,
        match_tier: outcome.tier,
        analysis_time_ms,
    }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze_image))
}
