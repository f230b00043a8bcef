//! Test Helper Utilities
//!
//! In-memory app state, stub integrations and request helpers shared by the
//! cafe-menu integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cafe_common::DishDraft;
use cafe_menu::services::vision_client::{Annotation, Annotations};
use cafe_menu::services::{
    CatalogError, CatalogRecord, CatalogSource, CreatedRecord, LabelSource, MatcherConfig,
    VisionError,
};
use cafe_menu::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Labeling service that always returns the same labels
pub struct FixedLabels(pub Vec<(&'static str, f32)>);

#[async_trait]
impl LabelSource for FixedLabels {
    fn source_id(&self) -> &'static str {
        "fixed"
    }

    async fn annotate(&self, _image: &[u8]) -> Result<Annotations, VisionError> {
        Ok(Annotations {
            labels: self
                .0
                .iter()
                .map(|(description, score)| Annotation {
                    description: description.to_string(),
                    score: *score,
                })
                .collect(),
            ..Default::default()
        })
    }
}

/// Labeling service that is always down
pub struct FailingLabels;

#[async_trait]
impl LabelSource for FailingLabels {
    fn source_id(&self) -> &'static str {
        "failing"
    }

    async fn annotate(&self, _image: &[u8]) -> Result<Annotations, VisionError> {
        Err(VisionError::NetworkError("connection refused".to_string()))
    }
}

/// CMS kept in memory
#[derive(Default)]
pub struct MemoryCatalog {
    pub records: Mutex<Vec<CatalogRecord>>,
    pub archived: Mutex<Vec<String>>,
}

impl MemoryCatalog {
    pub fn with_records(records: Vec<CatalogRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            ..Default::default()
        })
    }

    pub fn set_records(&self, records: Vec<CatalogRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    fn source_id(&self) -> &'static str {
        "memory"
    }

    async fn fetch_records(
        &self,
        record_id: Option<&str>,
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        let records = self.records.lock().unwrap().clone();
        match record_id {
            Some(id) => {
                let found: Vec<_> = records.into_iter().filter(|r| r.external_id == id).collect();
                if found.is_empty() {
                    Err(CatalogError::NotFound(id.to_string()))
                } else {
                    Ok(found)
                }
            }
            None => Ok(records),
        }
    }

    async fn archive(&self, external_id: &str) -> Result<(), CatalogError> {
        self.archived.lock().unwrap().push(external_id.to_string());
        Ok(())
    }

    async fn create_record(&self, draft: &DishDraft) -> Result<CreatedRecord, CatalogError> {
        let mut records = self.records.lock().unwrap();
        let external_id = format!("page-{}", records.len() + 1);
        let mut stored = draft.clone();
        stored.notion_id = Some(external_id.clone());
        records.push(CatalogRecord {
            external_id: external_id.clone(),
            draft: stored,
        });
        Ok(CreatedRecord {
            url: Some(format!("https://www.notion.so/{}", external_id)),
            external_id,
        })
    }
}

/// CMS record with a name and category
pub fn record(external_id: &str, name: &str, category: &str) -> CatalogRecord {
    CatalogRecord {
        external_id: external_id.to_string(),
        draft: DishDraft::new(name, category),
    }
}

/// App state over a fresh in-memory database
pub async fn test_state(
    label_source: Option<Arc<dyn LabelSource>>,
    catalog: Option<Arc<dyn CatalogSource>>,
) -> AppState {
    let db = cafe_common::db::init_memory_database().await.unwrap();
    AppState::new(db, label_source, catalog, MatcherConfig::default()).unwrap()
}

/// Router with no integrations configured
pub async fn test_app() -> (Router, AppState) {
    let state = test_state(None, None).await;
    (build_router(state.clone()), state)
}

/// Send a request and decode the JSON body (Null when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Base64 of some bytes standing in for a JPEG
pub fn fake_image_base64() -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(b"\xFF\xD8\xFFfake-jpeg-bytes")
}
