//! Notion API client
//!
//! Reads dish pages from a Notion database and maps their properties onto
//! [`DishDraft`]. Only the handful of endpoints the catalog mirror needs are
//! implemented: database query (cursor paginated), page retrieve, page
//! archive and page create.

use async_trait::async_trait;
use cafe_common::DishDraft;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::services::catalog_mirror::{CatalogError, CatalogRecord, CatalogSource, CreatedRecord};

pub const DEFAULT_NOTION_ENDPOINT: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const USER_AGENT: &str = concat!("cafe-menu/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: u32 = 100;

/// Resolved Notion settings
#[derive(Clone)]
pub struct NotionSettings {
    pub token: String,
    pub database_id: String,
    pub endpoint: String,
}

impl std::fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionSettings")
            .field("database_id", &self.database_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Notion REST client for the dishes database
pub struct NotionClient {
    http_client: reqwest::Client,
    settings: NotionSettings,
}

impl NotionClient {
    pub fn new(settings: NotionSettings) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.endpoint.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.url(path))
            .bearer_auth(&self.settings.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<T, CatalogError> {
        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), resource, "Notion request failed");
            return Err(CatalogError::ApiError(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    /// Every page in the dishes database
    pub async fn query_database(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        let path = format!("/v1/databases/{}/query", self.settings.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let page: QueryResponse = self
                .send(
                    self.request(reqwest::Method::POST, &path).json(&body),
                    &self.settings.database_id,
                )
                .await?;

            records.extend(
                page.results
                    .into_iter()
                    .filter(|p| !p.archived)
                    .map(record_from_page),
            );

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(records = records.len(), "Queried Notion database");
        Ok(records)
    }

    /// One page by id
    pub async fn retrieve_page(&self, page_id: &str) -> Result<CatalogRecord, CatalogError> {
        let page: Page = self
            .send(
                self.request(reqwest::Method::GET, &format!("/v1/pages/{}", page_id)),
                page_id,
            )
            .await?;

        if page.archived {
            return Err(CatalogError::NotFound(page_id.to_string()));
        }
        Ok(record_from_page(page))
    }

    pub async fn archive_page(&self, page_id: &str) -> Result<(), CatalogError> {
        let _: Value = self
            .send(
                self.request(reqwest::Method::PATCH, &format!("/v1/pages/{}", page_id))
                    .json(&json!({ "archived": true })),
                page_id,
            )
            .await?;
        tracing::info!(page_id, "Archived Notion page");
        Ok(())
    }

    pub async fn create_page(&self, draft: &DishDraft) -> Result<CreatedRecord, CatalogError> {
        let body = json!({
            "parent": { "database_id": self.settings.database_id },
            "properties": properties_from_draft(draft),
        });

        let page: Page = self
            .send(
                self.request(reqwest::Method::POST, "/v1/pages").json(&body),
                &self.settings.database_id,
            )
            .await?;

        Ok(CreatedRecord {
            external_id: page.id,
            url: page.url,
        })
    }
}

#[async_trait]
impl CatalogSource for NotionClient {
    fn source_id(&self) -> &'static str {
        "notion"
    }

    async fn fetch_records(
        &self,
        record_id: Option<&str>,
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        match record_id {
            Some(id) => Ok(vec![self.retrieve_page(id).await?]),
            None => self.query_database().await,
        }
    }

    async fn archive(&self, external_id: &str) -> Result<(), CatalogError> {
        self.archive_page(external_id).await
    }

    async fn create_record(&self, draft: &DishDraft) -> Result<CreatedRecord, CatalogError> {
        self.create_page(draft).await
    }
}

// ---- property mapping ----

fn plain_text(parts: Option<&Value>) -> Option<String> {
    let text: String = parts?
        .as_array()?
        .iter()
        .filter_map(|part| {
            part.get("plain_text")
                .or_else(|| part.pointer("/text/content"))
                .and_then(Value::as_str)
        })
        .collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn title(props: &Map<String, Value>, name: &str) -> Option<String> {
    plain_text(props.get(name).and_then(|p| p.get("title")))
}

fn rich_text(props: &Map<String, Value>, name: &str) -> Option<String> {
    plain_text(props.get(name).and_then(|p| p.get("rich_text")))
}

fn number(props: &Map<String, Value>, name: &str) -> Option<i64> {
    props
        .get(name)
        .and_then(|p| p.get("number"))
        .and_then(Value::as_f64)
        .map(|n| n.round() as i64)
}

fn select(props: &Map<String, Value>, name: &str) -> Option<String> {
    props
        .get(name)
        .and_then(|p| p.pointer("/select/name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn multi_select(props: &Map<String, Value>, name: &str) -> Vec<String> {
    props
        .get(name)
        .and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn checkbox(props: &Map<String, Value>, name: &str) -> Option<bool> {
    props
        .get(name)
        .and_then(|p| p.get("checkbox"))
        .and_then(Value::as_bool)
}

/// External links and Notion-hosted files
fn file_urls(props: &Map<String, Value>, name: &str) -> Vec<String> {
    props
        .get(name)
        .and_then(|p| p.get("files"))
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| {
                    f.pointer("/external/url")
                        .or_else(|| f.pointer("/file/url"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn record_from_page(page: Page) -> CatalogRecord {
    let props = &page.properties;
    let draft = DishDraft {
        notion_id: Some(page.id.clone()),
        name: title(props, "Name").unwrap_or_default(),
        name_en: rich_text(props, "NameEn"),
        category: select(props, "Category").unwrap_or_default(),
        price: number(props, "Price"),
        description: rich_text(props, "Description").unwrap_or_default(),
        chef_comment: rich_text(props, "ChefComment"),
        recommendation: rich_text(props, "Recommendation"),
        pairing_suggestion: rich_text(props, "PairingSuggestion"),
        ingredients: multi_select(props, "Ingredients"),
        allergens: multi_select(props, "Allergens"),
        keywords: multi_select(props, "Keywords"),
        visual_keywords: multi_select(props, "VisualKeywords"),
        image_urls: file_urls(props, "Images"),
        calories: number(props, "Calories"),
        available: checkbox(props, "Available").unwrap_or(true),
        seasonal: checkbox(props, "Seasonal").unwrap_or(false),
        popular: checkbox(props, "Popular").unwrap_or(false),
    };

    CatalogRecord {
        external_id: page.id,
        draft,
    }
}

fn text_value(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

fn options(values: &[String]) -> Value {
    Value::Array(values.iter().map(|v| json!({ "name": v })).collect())
}

fn properties_from_draft(draft: &DishDraft) -> Value {
    let mut props = json!({
        "Name": { "title": text_value(&draft.name) },
        "Category": { "select": { "name": draft.category } },
        "Description": { "rich_text": text_value(&draft.description) },
        "Ingredients": { "multi_select": options(&draft.ingredients) },
        "Allergens": { "multi_select": options(&draft.allergens) },
        "Keywords": { "multi_select": options(&draft.keywords) },
        "VisualKeywords": { "multi_select": options(&draft.visual_keywords) },
        "Available": { "checkbox": draft.available },
        "Seasonal": { "checkbox": draft.seasonal },
        "Popular": { "checkbox": draft.popular },
    });

    let optional_text = [
        ("NameEn", &draft.name_en),
        ("ChefComment", &draft.chef_comment),
        ("Recommendation", &draft.recommendation),
        ("PairingSuggestion", &draft.pairing_suggestion),
    ];
    for (name, value) in optional_text {
        if let Some(value) = value {
            props[name] = json!({ "rich_text": text_value(value) });
        }
    }
    if let Some(price) = draft.price {
        props["Price"] = json!({ "number": price });
    }
    if let Some(calories) = draft.calories {
        props["Calories"] = json!({ "number": calories });
    }
    if !draft.image_urls.is_empty() {
        let files: Vec<Value> = draft
            .image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                json!({
                    "type": "external",
                    "name": format!("image-{}", i + 1),
                    "external": { "url": url },
                })
            })
            .collect();
        props["Images"] = json!({ "files": files });
    }

    props
}
