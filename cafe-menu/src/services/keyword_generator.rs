//! Keyword generation for catalog dishes
//!
//! Builds the `keywords` and `visual_keywords` lists stored on a dish from
//! its name, its category and (when available) annotations of its photo.

use cafe_common::keywords::normalize_keywords;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::dishes::{self, DishFilter};
use crate::services::keyword_dictionary::{
    category_keywords, is_generic, name_based_keywords, semantic_mapping, translate_label,
};
use crate::services::keyword_extractor::{extraction_from_annotations, LabelSource};
use crate::types::KeywordSource;

const USER_AGENT: &str = concat!("cafe-menu/", env!("CARGO_PKG_VERSION"));

/// Confidence reported when no image annotations were used
pub const TEXT_ONLY_CONFIDENCE: f32 = 0.5;

/// Generated keyword lists for one dish
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedKeywords {
    pub keywords: Vec<String>,
    pub visual_keywords: Vec<String>,
    pub confidence: f32,
    pub used_vision: bool,
}

/// Keywords for a dish from its name, category and detected labels
pub fn semantic_keywords(
    name: &str,
    category: &str,
    labels: &[String],
    objects: &[String],
) -> Vec<String> {
    let mut keywords: Vec<String> = vec![name.to_string(), category.to_string()];
    keywords.extend(category_keywords(category).iter().map(|k| k.to_string()));

    for term in labels.iter().chain(objects) {
        let lowered = term.trim().to_lowercase();
        keywords.extend(semantic_mapping(&lowered).iter().map(|k| k.to_string()));
        keywords.push(lowered);
    }

    keywords.extend(name_based_keywords(name).into_iter().map(str::to_string));
    normalize_keywords(keywords)
}

/// Lists used when the image could not be fetched or annotated
pub fn fallback_keywords(name: &str, category: &str) -> GeneratedKeywords {
    GeneratedKeywords {
        keywords: normalize_keywords([name, category, "料理", "food"]),
        visual_keywords: vec!["美味しそう".to_string(), "食べ物".to_string()],
        confidence: TEXT_ONLY_CONFIDENCE,
        used_vision: false,
    }
}

/// Keyword generator with an optional labeling service
#[derive(Clone)]
pub struct KeywordGenerator {
    source: Option<Arc<dyn LabelSource>>,
    http_client: reqwest::Client,
}

impl KeywordGenerator {
    pub fn new(source: Option<Arc<dyn LabelSource>>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            source,
            http_client,
        })
    }

    /// Generate keywords; the photo is only used when a labeling service exists
    pub async fn generate(
        &self,
        name: &str,
        category: &str,
        image: Option<&[u8]>,
    ) -> GeneratedKeywords {
        let (Some(source), Some(image)) = (&self.source, image.filter(|i| !i.is_empty())) else {
            return GeneratedKeywords {
                keywords: semantic_keywords(name, category, &[], &[]),
                visual_keywords: Vec::new(),
                confidence: TEXT_ONLY_CONFIDENCE,
                used_vision: false,
            };
        };

        match source.annotate(image).await {
            Ok(annotations) => {
                let extraction = extraction_from_annotations(&annotations);
                let mut labels = Vec::new();
                let mut objects = Vec::new();
                for label in &extraction.labels {
                    match label.source {
                        KeywordSource::Object => objects.push(label.description.clone()),
                        _ => labels.push(label.description.clone()),
                    }
                }

                let visual_keywords = normalize_keywords(
                    labels
                        .iter()
                        .chain(&objects)
                        .filter(|l| !is_generic(l))
                        .flat_map(|l| translate_label(l)),
                );

                GeneratedKeywords {
                    keywords: semantic_keywords(name, category, &labels, &objects),
                    visual_keywords,
                    confidence: extraction.confidence,
                    used_vision: true,
                }
            }
            Err(e) => {
                tracing::warn!(
                    dish = name,
                    error = %e,
                    "Image annotation failed, using fallback keywords"
                );
                fallback_keywords(name, category)
            }
        }
    }

    /// Generate keywords, downloading the dish photo first when useful
    pub async fn generate_for_url(
        &self,
        name: &str,
        category: &str,
        image_url: Option<&str>,
    ) -> GeneratedKeywords {
        let Some(url) = image_url.filter(|_| self.source.is_some()) else {
            return self.generate(name, category, None).await;
        };

        match self.fetch_image(url).await {
            Ok(bytes) => self.generate(name, category, Some(&bytes)).await,
            Err(e) => {
                tracing::warn!(
                    dish = name,
                    url,
                    error = %e,
                    "Image download failed, using fallback keywords"
                );
                fallback_keywords(name, category)
            }
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.http_client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Outcome for one dish in a bulk regeneration
#[derive(Debug, Clone, Serialize)]
pub struct BulkItem {
    pub dish_id: Uuid,
    pub dish_name: String,
    pub keywords: Vec<String>,
    pub visual_keywords: Vec<String>,
    pub used_vision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a bulk regeneration
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReport {
    pub total: usize,
    /// Dishes processed without error (stored unless `dry_run`)
    pub updated: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub results: Vec<BulkItem>,
}

/// Regenerate keywords for every available dish, one at a time
///
/// With `dry_run` the generated lists are reported but not stored.
pub async fn regenerate_catalog_keywords(
    pool: &SqlitePool,
    generator: &KeywordGenerator,
    dry_run: bool,
) -> cafe_common::Result<BulkReport> {
    let catalog = dishes::list_dishes(
        pool,
        &DishFilter {
            category: None,
            available: Some(true),
        },
    )
    .await?;

    tracing::info!(count = catalog.len(), dry_run, "Starting bulk keyword regeneration");

    let mut report = BulkReport {
        total: catalog.len(),
        dry_run,
        ..Default::default()
    };

    for dish in catalog {
        let generated = generator
            .generate_for_url(
                &dish.name,
                &dish.category,
                dish.image_urls.first().map(String::as_str),
            )
            .await;

        let error = if dry_run {
            None
        } else {
            dishes::update_keywords(pool, dish.id, &generated.keywords, &generated.visual_keywords)
                .await
                .err()
                .map(|e| e.to_string())
        };

        match &error {
            Some(e) => {
                tracing::warn!(
                    dish_id = %dish.id,
                    dish = %dish.name,
                    error = %e,
                    "Keyword update failed"
                );
                report.failed += 1;
            }
            None => report.updated += 1,
        }

        report.results.push(BulkItem {
            dish_id: dish.id,
            dish_name: dish.name,
            keywords: generated.keywords,
            visual_keywords: generated.visual_keywords,
            used_vision: generated.used_vision,
            error,
        });
    }

    tracing::info!(
        updated = report.updated,
        failed = report.failed,
        "Bulk keyword regeneration complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vision_client::{Annotation, Annotations, VisionError};
    use async_trait::async_trait;
    use cafe_common::db::init_memory_database;
    use cafe_common::DishDraft;

    struct CakeLabels;

    #[async_trait]
    impl LabelSource for CakeLabels {
        fn source_id(&self) -> &'static str {
            "cake"
        }

        async fn annotate(&self, _image: &[u8]) -> Result<Annotations, VisionError> {
            Ok(Annotations {
                labels: vec![
                    Annotation {
                        description: "Cake".into(),
                        score: 0.9,
                    },
                    Annotation {
                        description: "Tableware".into(),
                        score: 0.8,
                    },
                ],
                ..Default::default()
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl LabelSource for Broken {
        fn source_id(&self) -> &'static str {
            "broken"
        }

        async fn annotate(&self, _image: &[u8]) -> Result<Annotations, VisionError> {
            Err(VisionError::NetworkError("down".into()))
        }
    }

    #[test]
    fn test_semantic_keywords_from_name_and_category() {
        let keywords = semantic_keywords("チョコレートケーキ", "デザート", &[], &[]);
        assert_eq!(keywords[0], "チョコレートケーキ");
        assert_eq!(keywords[1], "デザート");
        assert!(keywords.contains(&"sweet".to_string()));
        assert!(keywords.contains(&"chocolate".to_string()));
    }

    #[test]
    fn test_semantic_keywords_expand_labels() {
        let keywords = semantic_keywords("本日のケーキ", "デザート", &["Cake".into()], &[]);
        assert!(keywords.contains(&"cake".to_string()));
        assert!(keywords.contains(&"スイーツ".to_string()));
        assert_eq!(
            keywords.iter().filter(|k| k.eq_ignore_ascii_case("cake")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_generate_without_image_is_text_only() {
        let generator = KeywordGenerator::new(Some(Arc::new(CakeLabels))).unwrap();
        let generated = generator.generate("カフェラテ", "ドリンク", None).await;
        assert!(!generated.used_vision);
        assert!(generated.keywords.contains(&"latte".to_string()));
        assert_eq!(generated.confidence, TEXT_ONLY_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_generate_with_image_uses_labels() {
        let generator = KeywordGenerator::new(Some(Arc::new(CakeLabels))).unwrap();
        let generated = generator
            .generate("いちごのショート", "デザート", Some(b"jpeg"))
            .await;
        assert!(generated.used_vision);
        assert!(generated.keywords.contains(&"cake".to_string()));
        assert!(generated.visual_keywords.contains(&"ケーキ".to_string()));
        // generic labels never become visual keywords
        assert!(!generated.visual_keywords.iter().any(|k| k.eq_ignore_ascii_case("tableware")));
    }

    #[tokio::test]
    async fn test_generate_falls_back_when_annotation_fails() {
        let generator = KeywordGenerator::new(Some(Arc::new(Broken))).unwrap();
        let generated = generator.generate("スコーン", "デザート", Some(b"jpeg")).await;
        assert_eq!(generated, fallback_keywords("スコーン", "デザート"));
        assert_eq!(generated.keywords, vec!["スコーン", "デザート", "料理", "food"]);
    }

    #[tokio::test]
    async fn test_bulk_regeneration_respects_dry_run() {
        let pool = init_memory_database().await.unwrap();
        let mut sold_out = DishDraft::new("季節のタルト", "デザート");
        sold_out.available = false;
        let latte = DishDraft::new("カフェラテ", "ドリンク").into_dish();
        dishes::insert_dish(&pool, &latte).await.unwrap();
        dishes::insert_dish(&pool, &sold_out.into_dish()).await.unwrap();

        let generator = KeywordGenerator::new(None).unwrap();

        let dry = regenerate_catalog_keywords(&pool, &generator, true).await.unwrap();
        assert_eq!(dry.total, 1);
        let unchanged = dishes::get_dish(&pool, latte.id).await.unwrap().unwrap();
        assert!(unchanged.keywords.is_empty());

        let report = regenerate_catalog_keywords(&pool, &generator, false).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 0);
        let updated = dishes::get_dish(&pool, latte.id).await.unwrap().unwrap();
        assert!(updated.keywords.contains(&"ドリンク".to_string()));
    }
}
