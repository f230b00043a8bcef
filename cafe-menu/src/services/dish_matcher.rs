//! Dish matching
//!
//! Scores every available dish against weighted keywords. A keyword counts
//! for a dish when its lower-cased text is a substring of the dish's name,
//! localized name, description, keywords or visual keywords; the dish score
//! is the sum of `confidence × source_weight` over counting keywords.
//! Generic keywords ("food", colours, 料理, ...) are removed first.
//!
//! When nothing reaches `min_score`, the configured fallback policy decides
//! whether to suggest dishes from the inferred category, then popular dishes.

use cafe_common::Dish;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::services::keyword_dictionary::{infer_category, is_generic};
use crate::types::WeightedKeyword;

pub const DEFAULT_MIN_SCORE: f32 = 0.5;
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// What to suggest when no dish scores high enough
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Exact matches only
    Strict,
    /// Exact, then dishes in the category inferred from the keywords
    #[default]
    Category,
    /// Exact, then category, then popular dishes
    Cascade,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(FallbackPolicy::Strict),
            "category" => Ok(FallbackPolicy::Category),
            "cascade" => Ok(FallbackPolicy::Cascade),
            other => Err(format!(
                "Unknown fallback policy '{}' (expected strict, category or cascade)",
                other
            )),
        }
    }
}

/// Which stage produced the suggested dishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Category,
    Popular,
    None,
}

/// Matcher settings
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Inclusive lower bound on dish score
    pub min_score: f32,
    pub max_results: usize,
    pub fallback: FallbackPolicy,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
            fallback: FallbackPolicy::default(),
        }
    }
}

/// A dish with its match score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDish {
    pub dish: Dish,
    pub score: f32,
}

/// Suggested dishes and the tier that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub dishes: Vec<ScoredDish>,
    pub tier: MatchTier,
}

#[derive(Debug, Clone, Default)]
pub struct DishMatcher {
    config: MatcherConfig,
}

impl DishMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score one dish (0.0 when nothing matches)
    pub fn score(&self, dish: &Dish, keywords: &[WeightedKeyword]) -> f32 {
        let haystacks = searchable_fields(dish);

        keywords
            .iter()
            .filter(|k| !is_generic(&k.text))
            .filter_map(|k| {
                let needle = k.text.trim().to_lowercase();
                if needle.is_empty() {
                    return None;
                }
                haystacks
                    .iter()
                    .any(|h| h.contains(&needle))
                    .then(|| k.weight())
            })
            .sum()
    }

    /// Every available dish with a positive score, best first, untruncated
    pub fn rank(&self, dishes: &[Dish], keywords: &[WeightedKeyword]) -> Vec<ScoredDish> {
        let mut scored: Vec<ScoredDish> = dishes
            .iter()
            .filter(|d| d.available)
            .map(|d| ScoredDish {
                score: self.score(d, keywords),
                dish: d.clone(),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.dish.name.cmp(&b.dish.name))
        });
        scored
    }

    /// Exact matches at or above `min_score`, truncated to `max_results`
    pub fn exact_matches(&self, dishes: &[Dish], keywords: &[WeightedKeyword]) -> Vec<ScoredDish> {
        self.rank(dishes, keywords)
            .into_iter()
            .filter(|s| s.score >= self.config.min_score)
            .take(self.config.max_results)
            .collect()
    }

    /// Exact matches, falling back according to the configured policy
    pub fn match_dishes(&self, dishes: &[Dish], keywords: &[WeightedKeyword]) -> MatchOutcome {
        let exact = self.exact_matches(dishes, keywords);
        if !exact.is_empty() {
            return MatchOutcome {
                dishes: exact,
                tier: MatchTier::Exact,
            };
        }

        if self.config.fallback == FallbackPolicy::Strict {
            return MatchOutcome {
                dishes: Vec::new(),
                tier: MatchTier::None,
            };
        }

        let texts: Vec<&str> = keywords.iter().map(|k| k.text.as_str()).collect();
        if let Some(category) = infer_category(&texts) {
            let in_category = self.pick(dishes, |d| d.category == category);
            if !in_category.is_empty() {
                tracing::debug!(category, count = in_category.len(), "Category fallback");
                return MatchOutcome {
                    dishes: in_category,
                    tier: MatchTier::Category,
                };
            }
        }

        if self.config.fallback == FallbackPolicy::Cascade {
            let popular = self.pick(dishes, |d| d.popular);
            if !popular.is_empty() {
                tracing::debug!(count = popular.len(), "Popular fallback");
                return MatchOutcome {
                    dishes: popular,
                    tier: MatchTier::Popular,
                };
            }
        }

        MatchOutcome {
            dishes: Vec::new(),
            tier: MatchTier::None,
        }
    }

    /// Available dishes passing `filter`, by name, score 0
    fn pick(&self, dishes: &[Dish], filter: impl Fn(&Dish) -> bool) -> Vec<ScoredDish> {
        let mut picked: Vec<&Dish> = dishes.iter().filter(|d| d.available && filter(d)).collect();
        picked.sort_by(|a, b| a.name.cmp(&b.name));
        picked
            .into_iter()
            .take(self.config.max_results)
            .map(|d| ScoredDish {
                dish: d.clone(),
                score: 0.0,
            })
            .collect()
    }
}

fn searchable_fields(dish: &Dish) -> Vec<String> {
    let mut fields = Vec::with_capacity(3 + dish.keywords.len() + dish.visual_keywords.len());
    fields.push(dish.name.to_lowercase());
    if let Some(name_en) = &dish.name_en {
        fields.push(name_en.to_lowercase());
    }
    fields.push(dish.description.to_lowercase());
    fields.extend(dish.keywords.iter().map(|k| k.to_lowercase()));
    fields.extend(dish.visual_keywords.iter().map(|k| k.to_lowercase()));
    fields
}
