//! Dish model shared by the catalog store, the matcher and the CMS mirror

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::keywords::normalize_keywords;
use crate::{Error, Result};

/// One menu item in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: Uuid,
    /// Page id of the mirrored CMS record (unique when present)
    pub notion_id: Option<String>,
    pub name: String,
    pub name_en: Option<String>,
    pub category: String,
    /// Price in the smallest currency unit
    pub price: Option<i64>,
    pub description: String,
    pub chef_comment: Option<String>,
    pub recommendation: Option<String>,
    pub pairing_suggestion: Option<String>,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub keywords: Vec<String>,
    pub visual_keywords: Vec<String>,
    pub image_urls: Vec<String>,
    pub calories: Option<i64>,
    pub available: bool,
    pub seasonal: bool,
    pub popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input for creating a dish (admin CRUD and CMS mirror)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DishDraft {
    #[serde(default)]
    pub notion_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub category: String,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chef_comment: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub pairing_suggestion: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub visual_keywords: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub calories: Option<i64>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub seasonal: bool,
    #[serde(default)]
    pub popular: bool,
}

impl DishDraft {
    /// Create a minimal draft with a name and category
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            available: true,
            ..Default::default()
        }
    }

    /// Check required fields of a dish entered by an admin
    pub fn validate(&self) -> Result<()> {
        self.validate_mirrored()?;
        if self.category.trim().is_empty() {
            return Err(Error::InvalidInput("Dish category is required".to_string()));
        }
        Ok(())
    }

    /// Looser check for records mirrored from the CMS, where the category
    /// select may be left empty
    pub fn validate_mirrored(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Dish name is required".to_string()));
        }
        if matches!(self.price, Some(p) if p < 0) {
            return Err(Error::InvalidInput("Price cannot be negative".to_string()));
        }
        Ok(())
    }

    /// Trim text fields and deduplicate every list
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.notion_id = self.notion_id.filter(|id| !id.trim().is_empty());
        self.ingredients = normalize_keywords(&self.ingredients);
        self.allergens = normalize_keywords(&self.allergens);
        self.keywords = normalize_keywords(&self.keywords);
        self.visual_keywords = normalize_keywords(&self.visual_keywords);
        self.image_urls = normalize_keywords(&self.image_urls);
        self
    }

    /// Materialize into a new dish with a fresh id and timestamps
    pub fn into_dish(self) -> Dish {
        let now = Utc::now();
        let draft = self.normalized();
        Dish {
            id: Uuid::new_v4(),
            notion_id: draft.notion_id,
            name: draft.name,
            name_en: draft.name_en,
            category: draft.category,
            price: draft.price,
            description: draft.description,
            chef_comment: draft.chef_comment,
            recommendation: draft.recommendation,
            pairing_suggestion: draft.pairing_suggestion,
            ingredients: draft.ingredients,
            allergens: draft.allergens,
            keywords: draft.keywords,
            visual_keywords: draft.visual_keywords,
            image_urls: draft.image_urls,
            calories: draft.calories,
            available: draft.available,
            seasonal: draft.seasonal,
            popular: draft.popular,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tell an absent field (`None`) from an explicit `null` (`Some(None)`)
fn nullable<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update; `None` leaves the field untouched
///
/// Optional dish fields take a nested option: `Some(None)` (a JSON `null`)
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DishPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub name_en: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<i64>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub chef_comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub pairing_suggestion: Option<Option<String>>,
    pub ingredients: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub visual_keywords: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub calories: Option<Option<i64>>,
    pub available: Option<bool>,
    pub seasonal: Option<bool>,
    pub popular: Option<bool>,
}

impl DishPatch {
    /// Apply the patch in place, normalizing lists and bumping `updated_at`
    pub fn apply_to(self, dish: &mut Dish) -> Result<()> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("Dish name cannot be blank".to_string()));
            }
            dish.name = name.trim().to_string();
        }
        if let Some(category) = self.category {
            if category.trim().is_empty() {
                return Err(Error::InvalidInput("Dish category cannot be blank".to_string()));
            }
            dish.category = category.trim().to_string();
        }
        if let Some(price) = self.price {
            if matches!(price, Some(p) if p < 0) {
                return Err(Error::InvalidInput("Price cannot be negative".to_string()));
            }
            dish.price = price;
        }
        if let Some(v) = self.name_en {
            dish.name_en = non_blank(v);
        }
        if let Some(v) = self.description {
            dish.description = v;
        }
        if let Some(v) = self.chef_comment {
            dish.chef_comment = non_blank(v);
        }
        if let Some(v) = self.recommendation {
            dish.recommendation = non_blank(v);
        }
        if let Some(v) = self.pairing_suggestion {
            dish.pairing_suggestion = non_blank(v);
        }
        if let Some(v) = self.ingredients {
            dish.ingredients = normalize_keywords(&v);
        }
        if let Some(v) = self.allergens {
            dish.allergens = normalize_keywords(&v);
        }
        if let Some(v) = self.keywords {
            dish.keywords = normalize_keywords(&v);
        }
        if let Some(v) = self.visual_keywords {
            dish.visual_keywords = normalize_keywords(&v);
        }
        if let Some(v) = self.image_urls {
            dish.image_urls = normalize_keywords(&v);
        }
        if let Some(v) = self.calories {
            dish.calories = v;
        }
        if let Some(v) = self.available {
            dish.available = v;
        }
        if let Some(v) = self.seasonal {
            dish.seasonal = v;
        }
        if let Some(v) = self.popular {
            dish.popular = v;
        }
        dish.updated_at = Utc::now();
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
