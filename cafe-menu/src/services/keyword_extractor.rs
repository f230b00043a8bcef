//! Keyword extraction from food photos
//!
//! Annotations from the labeling service are filtered by score, expanded
//! through the translation dictionary and deduplicated. When no labeling
//! service is configured, or the call fails, a deterministic canned guess is
//! returned instead so analysis never fails on the vision side.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::services::keyword_dictionary::{food_terms_in_text, translate_label};
use crate::services::vision_client::{Annotations, VisionError};
use crate::types::{DetectedLabel, KeywordSource, WeightedKeyword};

/// Labels scored below this are dropped
pub const LABEL_THRESHOLD: f32 = 0.6;
/// Objects scored below this are dropped
pub const OBJECT_THRESHOLD: f32 = 0.5;
/// Confidence reported for the canned guess
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

/// Canned keyword sets used when the labeling service is unavailable
const FALLBACK_SETS: &[&[&str]] = &[
    &["coffee", "latte", "cup"],
    &["cake", "dessert", "sweet"],
    &["sandwich", "bread", "lunch"],
    &["salad", "vegetable", "healthy"],
    &["pasta", "noodle"],
    &["tea", "drink"],
];

/// Anything that can annotate an image with labels
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Short identifier for logs
    fn source_id(&self) -> &'static str;

    async fn annotate(&self, image: &[u8]) -> Result<Annotations, VisionError>;
}

/// Result of one extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Deduplicated keywords, highest weight first
    pub keywords: Vec<WeightedKeyword>,
    /// Raw labels that survived filtering
    pub labels: Vec<DetectedLabel>,
    /// Mean score of the kept labels and objects
    pub confidence: f32,
    pub using_vision_api: bool,
}

impl Extraction {
    /// Keyword strings in order
    pub fn detected_items(&self) -> Vec<String> {
        self.keywords.iter().map(|k| k.text.clone()).collect()
    }
}

/// Turns an image into weighted keywords
#[derive(Clone, Default)]
pub struct KeywordExtractor {
    source: Option<Arc<dyn LabelSource>>,
}

impl KeywordExtractor {
    pub fn new(source: Option<Arc<dyn LabelSource>>) -> Self {
        Self { source }
    }

    pub fn has_label_source(&self) -> bool {
        self.source.is_some()
    }

    /// Extract keywords from image bytes. Never fails.
    pub async fn extract(&self, image: &[u8]) -> Extraction {
        let Some(source) = &self.source else {
            tracing::debug!("No label source configured, using fallback guess");
            return fallback_extraction(image);
        };

        match source.annotate(image).await {
            Ok(annotations) => {
                let extraction = extraction_from_annotations(&annotations);
                tracing::info!(
                    source = source.source_id(),
                    keywords = extraction.keywords.len(),
                    confidence = extraction.confidence,
                    "Extracted keywords from image"
                );
                extraction
            }
            Err(e) => {
                tracing::warn!(
                    source = source.source_id(),
                    error = %e,
                    "Label source failed, using fallback guess"
                );
                fallback_extraction(image)
            }
        }
    }
}

/// Filter, translate and deduplicate annotations
pub fn extraction_from_annotations(annotations: &Annotations) -> Extraction {
    let mut labels = Vec::new();

    for label in &annotations.labels {
        if label.score >= LABEL_THRESHOLD {
            labels.push(DetectedLabel {
                description: label.description.clone(),
                score: label.score,
                source: KeywordSource::Label,
            });
        }
    }
    for object in &annotations.objects {
        if object.score >= OBJECT_THRESHOLD {
            labels.push(DetectedLabel {
                description: object.description.clone(),
                score: object.score,
                source: KeywordSource::Object,
            });
        }
    }

    let confidence = if labels.is_empty() {
        0.0
    } else {
        labels.iter().map(|l| l.score).sum::<f32>() / labels.len() as f32
    };

    // text annotations carry no score
    if let Some(text) = &annotations.text {
        for term in food_terms_in_text(text) {
            labels.push(DetectedLabel {
                description: term,
                score: 1.0,
                source: KeywordSource::Text,
            });
        }
    }

    let mut keywords = Vec::new();
    for label in &labels {
        let lowered = label.description.trim().to_lowercase();
        push_keyword(
            &mut keywords,
            WeightedKeyword::new(lowered.clone(), label.score, label.source),
        );
        for synonym in translate_label(&lowered) {
            push_keyword(
                &mut keywords,
                WeightedKeyword::new(synonym, label.score, label.source),
            );
        }
    }

    keywords.sort_by(|a, b| b.weight().total_cmp(&a.weight()));

    Extraction {
        keywords,
        labels,
        confidence,
        using_vision_api: true,
    }
}

/// Keep one entry per keyword (case-insensitive), with the higher weight
fn push_keyword(keywords: &mut Vec<WeightedKeyword>, keyword: WeightedKeyword) {
    if keyword.text.is_empty() {
        return;
    }
    let key = keyword.text.to_lowercase();
    match keywords.iter_mut().find(|k| k.text.to_lowercase() == key) {
        Some(existing) => {
            if keyword.weight() > existing.weight() {
                *existing = keyword;
            }
        }
        None => keywords.push(keyword),
    }
}

/// Deterministic canned guess for an image
pub fn fallback_extraction(image: &[u8]) -> Extraction {
    let digest = Sha256::digest(image);
    let index = digest[0] as usize % FALLBACK_SETS.len();
    let set = FALLBACK_SETS[index];

    let labels: Vec<DetectedLabel> = set
        .iter()
        .map(|term| DetectedLabel {
            description: term.to_string(),
            score: FALLBACK_CONFIDENCE,
            source: KeywordSource::Fallback,
        })
        .collect();

    let mut keywords = Vec::new();
    for term in set {
        push_keyword(
            &mut keywords,
            WeightedKeyword::new(*term, FALLBACK_CONFIDENCE, KeywordSource::Fallback),
        );
        for synonym in translate_label(term) {
            push_keyword(
                &mut keywords,
                WeightedKeyword::new(synonym, FALLBACK_CONFIDENCE, KeywordSource::Fallback),
            );
        }
    }

    Extraction {
        keywords,
        labels,
        confidence: FALLBACK_CONFIDENCE,
        using_vision_api: false,
    }
}

/// Decode base64 image data, accepting an optional `data:...;base64,` prefix
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = data.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    general_purpose::STANDARD.decode(payload)
}
