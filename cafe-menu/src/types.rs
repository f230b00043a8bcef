//! Shared keyword types for extraction, generation and matching

use serde::{Deserialize, Serialize};

/// Where a keyword came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    /// Label detection on the image
    Label,
    /// Object localization on the image
    Object,
    /// Food term found in text printed on the image (menus)
    Text,
    /// Typed by a user in a search request
    Query,
    /// Canned guess used when the labeling service is unavailable
    Fallback,
}

impl KeywordSource {
    /// Multiplier applied to the keyword's confidence when scoring dishes
    pub fn weight(&self) -> f32 {
        match self {
            KeywordSource::Label => 1.0,
            KeywordSource::Object => 1.0,
            KeywordSource::Text => 1.2,
            KeywordSource::Query => 1.0,
            KeywordSource::Fallback => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordSource::Label => "label",
            KeywordSource::Object => "object",
            KeywordSource::Text => "text",
            KeywordSource::Query => "query",
            KeywordSource::Fallback => "fallback",
        }
    }
}

/// A keyword with the confidence of the annotation it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub text: String,
    /// Confidence (0.0-1.0), clamped on construction
    pub confidence: f32,
    pub source: KeywordSource,
}

impl WeightedKeyword {
    pub fn new(text: impl Into<String>, confidence: f32, source: KeywordSource) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    /// Keyword typed by a user (full confidence)
    pub fn query(text: impl Into<String>) -> Self {
        Self::new(text, 1.0, KeywordSource::Query)
    }

    /// Contribution of this keyword to a dish score
    pub fn weight(&self) -> f32 {
        self.confidence * self.source.weight()
    }
}

/// A raw label reported by the labeling service (or the fallback guess)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    pub description: String,
    pub score: f32,
    pub source: KeywordSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(WeightedKeyword::new("cake", 1.7, KeywordSource::Label).confidence, 1.0);
        assert_eq!(WeightedKeyword::new("cake", -0.2, KeywordSource::Label).confidence, 0.0);
    }

    #[test]
    fn test_text_keywords_outweigh_labels() {
        let text = WeightedKeyword::new("latte", 0.8, KeywordSource::Text);
        let label = WeightedKeyword::new("latte", 0.8, KeywordSource::Label);
        assert!(text.weight() > label.weight());
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let json = serde_json::to_string(&KeywordSource::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }
}
