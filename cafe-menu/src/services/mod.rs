//! Services: image labeling, keyword dictionaries, matching, keyword
//! generation and the CMS mirror

pub mod catalog_mirror;
pub mod dish_matcher;
pub mod keyword_dictionary;
pub mod keyword_extractor;
pub mod keyword_generator;
pub mod notion_client;
pub mod vision_client;

pub use catalog_mirror::{CatalogError, CatalogRecord, CatalogSource, CreatedRecord};
pub use dish_matcher::{DishMatcher, FallbackPolicy, MatchTier, MatcherConfig};
pub use keyword_extractor::{KeywordExtractor, LabelSource};
pub use keyword_generator::KeywordGenerator;
pub use notion_client::{NotionClient, NotionSettings};
pub use vision_client::{VisionClient, VisionCredentials, VisionError, VisionSettings};
