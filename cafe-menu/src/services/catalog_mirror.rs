//! One-way catalog mirror: CMS → local store
//!
//! Records are upserted by their CMS id, so repeated syncs never duplicate a
//! dish. Deleting a dish removes it locally and archives the CMS record on a
//! best-effort basis. Nothing flows from the store back to the CMS except
//! explicit creation and archival.

use async_trait::async_trait;
use cafe_common::{Dish, DishDraft};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::dishes;
use crate::services::keyword_generator::KeywordGenerator;

/// Catalog mirror errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("CMS API error {0}: {1}")]
    ApiError(u16, String),

    #[error("CMS record not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    Store(#[from] cafe_common::Error),
}

/// A dish record read from the CMS
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub external_id: String,
    /// Dish fields; `notion_id` is set to `external_id`
    pub draft: DishDraft,
}

/// Identifiers of a record created in the CMS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedRecord {
    pub external_id: String,
    pub url: Option<String>,
}

/// Where dish records are authored
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short identifier for logs
    fn source_id(&self) -> &'static str;

    /// All records, or just `record_id` when given
    async fn fetch_records(&self, record_id: Option<&str>)
        -> Result<Vec<CatalogRecord>, CatalogError>;

    async fn archive(&self, external_id: &str) -> Result<(), CatalogError>;

    async fn create_record(&self, draft: &DishDraft) -> Result<CreatedRecord, CatalogError>;
}

/// Sync parameters
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only mirror this record
    pub record_id: Option<String>,
    /// Replace the record's keywords with generated ones when it has a photo
    pub generate_keywords: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Skipped,
    Failed,
}

/// Outcome for one CMS record
#[derive(Debug, Clone, Serialize)]
pub struct SyncItem {
    pub external_id: String,
    pub name: String,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_id: Option<Uuid>,
    pub keywords_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary of one sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<SyncItem>,
}

/// Mirror CMS records into the store
///
/// A failing fetch aborts the run; per-record failures are reported and the
/// run continues.
pub async fn sync_catalog(
    pool: &SqlitePool,
    source: &dyn CatalogSource,
    generator: &KeywordGenerator,
    options: &SyncOptions,
) -> Result<SyncReport, CatalogError> {
    let records = source.fetch_records(options.record_id.as_deref()).await?;

    tracing::info!(
        source = source.source_id(),
        records = records.len(),
        generate_keywords = options.generate_keywords,
        "Starting catalog sync"
    );

    let mut report = SyncReport {
        fetched: records.len(),
        ..Default::default()
    };

    for record in records {
        let item = mirror_record(pool, generator, record, options.generate_keywords).await;
        match item.status {
            SyncStatus::Synced => report.synced += 1,
            SyncStatus::Skipped => report.skipped += 1,
            SyncStatus::Failed => report.failed += 1,
        }
        report.results.push(item);
    }

    tracing::info!(
        synced = report.synced,
        skipped = report.skipped,
        failed = report.failed,
        "Catalog sync complete"
    );

    Ok(report)
}

async fn mirror_record(
    pool: &SqlitePool,
    generator: &KeywordGenerator,
    record: CatalogRecord,
    generate_keywords: bool,
) -> SyncItem {
    let CatalogRecord {
        external_id,
        mut draft,
    } = record;
    draft.notion_id = Some(external_id.clone());

    if draft.name.trim().is_empty() {
        tracing::warn!(external_id = %external_id, "Skipping CMS record without a name");
        return SyncItem {
            external_id,
            name: String::new(),
            status: SyncStatus::Skipped,
            dish_id: None,
            keywords_generated: false,
            message: Some("Record has no name".to_string()),
        };
    }

    let mut keywords_generated = false;
    if generate_keywords {
        if let Some(image_url) = draft.image_urls.first().cloned() {
            let generated = generator
                .generate_for_url(&draft.name, &draft.category, Some(&image_url))
                .await;
            draft.keywords = generated.keywords;
            draft.visual_keywords = generated.visual_keywords;
            keywords_generated = true;
        }
    }

    let name = draft.name.clone();
    match dishes::upsert_by_notion_id(pool, draft).await {
        Ok(dish) => {
            tracing::debug!(external_id = %external_id, dish_id = %dish.id, "Mirrored record");
            SyncItem {
                external_id,
                name,
                status: SyncStatus::Synced,
                dish_id: Some(dish.id),
                keywords_generated,
                message: None,
            }
        }
        Err(e) => {
            tracing::warn!(external_id = %external_id, error = %e, "Failed to mirror record");
            SyncItem {
                external_id,
                name,
                status: SyncStatus::Failed,
                dish_id: None,
                keywords_generated,
                message: Some(e.to_string()),
            }
        }
    }
}

/// Which dish to delete
#[derive(Debug, Clone)]
pub enum DeleteTarget {
    Id(Uuid),
    ExternalId(String),
}

/// What a delete actually removed
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub deleted_from_store: bool,
    pub archived_in_cms: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_name: Option<String>,
}

/// Delete a dish locally and archive its CMS record (best effort)
pub async fn remove_dish(
    pool: &SqlitePool,
    source: Option<&dyn CatalogSource>,
    target: DeleteTarget,
) -> Result<DeleteOutcome, CatalogError> {
    let (dish, external_id) = match &target {
        DeleteTarget::Id(id) => {
            let dish = dishes::get_dish(pool, *id)
                .await?
                .ok_or_else(|| cafe_common::Error::NotFound(format!("Dish {}", id)))?;
            let external_id = dish.notion_id.clone();
            (Some(dish), external_id)
        }
        DeleteTarget::ExternalId(external_id) => {
            let dish = dishes::get_dish_by_notion_id(pool, external_id).await?;
            (dish, Some(external_id.clone()))
        }
    };

    let archived_in_cms = match (source, external_id.as_deref()) {
        (Some(source), Some(external_id)) => match source.archive(external_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(external_id, error = %e, "Failed to archive CMS record");
                false
            }
        },
        _ => false,
    };

    let deleted_from_store = match &target {
        DeleteTarget::Id(id) => dishes::delete_dish(pool, *id).await?,
        DeleteTarget::ExternalId(external_id) => {
            dishes::delete_by_notion_id(pool, external_id).await?
        }
    };

    if !deleted_from_store && !archived_in_cms {
        let what = match target {
            DeleteTarget::Id(id) => format!("Dish {}", id),
            DeleteTarget::ExternalId(id) => format!("Dish with CMS id {}", id),
        };
        return Err(cafe_common::Error::NotFound(what).into());
    }

    tracing::info!(
        dish = dish.as_ref().map(|d| d.name.as_str()).unwrap_or(""),
        deleted_from_store,
        archived_in_cms,
        "Deleted dish"
    );

    Ok(DeleteOutcome {
        deleted_from_store,
        archived_in_cms,
        dish_name: dish.map(|d| d.name),
    })
}

/// Result of creating a dish in the CMS
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub record: CreatedRecord,
    pub dish: Dish,
}

/// Create a record in the CMS and mirror it immediately
///
/// When reading the new record back fails, the submitted draft is mirrored
/// instead.
pub async fn create_and_mirror(
    pool: &SqlitePool,
    source: &dyn CatalogSource,
    draft: DishDraft,
) -> Result<CreateOutcome, CatalogError> {
    let draft = draft.normalized();
    draft.validate()?;

    let record = source.create_record(&draft).await?;
    tracing::info!(external_id = %record.external_id, dish = %draft.name, "Created CMS record");

    let mirrored = match source.fetch_records(Some(&record.external_id)).await {
        Ok(records) => records.into_iter().next().map(|r| r.draft),
        Err(e) => {
            tracing::warn!(
                external_id = %record.external_id,
                error = %e,
                "Could not read back new CMS record"
            );
            None
        }
    };

    let mut to_store = mirrored
        .filter(|d| !d.name.trim().is_empty())
        .unwrap_or(draft);
    to_store.notion_id = Some(record.external_id.clone());

    let dish = dishes::upsert_by_notion_id(pool, to_store).await?;

    Ok(CreateOutcome { record, dish })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_common::db::init_memory_database;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySource {
        records: Mutex<Vec<CatalogRecord>>,
        archived: Mutex<Vec<String>>,
        fail_archive: bool,
    }

    impl MemorySource {
        fn with(records: Vec<CatalogRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CatalogSource for MemorySource {
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
                    let found: Vec<_> =
                        records.into_iter().filter(|r| r.external_id == id).collect();
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
            if self.fail_archive {
                return Err(CatalogError::ApiError(500, "unavailable".into()));
            }
            self.archived.lock().unwrap().push(external_id.to_string());
            Ok(())
        }

        async fn create_record(&self, draft: &DishDraft) -> Result<CreatedRecord, CatalogError> {
            let mut records = self.records.lock().unwrap();
            let external_id = format!("page-{}", records.len() + 1);
            records.push(record(&external_id, &draft.name));
            Ok(CreatedRecord {
                external_id,
                url: None,
            })
        }
    }

    fn record(external_id: &str, name: &str) -> CatalogRecord {
        CatalogRecord {
            external_id: external_id.to_string(),
            draft: DishDraft::new(name, "デザート"),
        }
    }

    fn generator() -> KeywordGenerator {
        KeywordGenerator::new(None).unwrap()
    }

    #[tokio::test]
    async fn test_sync_skips_records_without_name() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::with(vec![record("page-1", "プリン"), record("page-2", "  ")]);

        let report = sync_catalog(&pool, &source, &generator(), &SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.synced, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.results[1].status, SyncStatus::Skipped);
    }

    #[tokio::test]
    async fn test_sync_stores_record_without_category() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::with(vec![CatalogRecord {
            external_id: "page-1".into(),
            draft: DishDraft::new("季節のスープ", ""),
        }]);

        let report = sync_catalog(&pool, &source, &generator(), &SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);
        let soup = dishes::get_dish_by_notion_id(&pool, "page-1").await.unwrap().unwrap();
        assert_eq!(soup.name, "季節のスープ");
        assert_eq!(soup.category, "");
    }

    #[tokio::test]
    async fn test_create_requires_category() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::default();
        let err = create_and_mirror(&pool, &source, DishDraft::new("季節のスープ", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(cafe_common::Error::InvalidInput(_))));
        assert!(source.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_record_sync_reports_missing_record() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::with(vec![record("page-1", "プリン")]);
        let options = SyncOptions {
            record_id: Some("page-404".into()),
            ..Default::default()
        };

        let err = sync_catalog(&pool, &source, &generator(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_keywords_generated_only_for_records_with_images() {
        let pool = init_memory_database().await.unwrap();
        let mut with_image = record("page-1", "チーズケーキ");
        with_image.draft.image_urls = vec!["https://img.example.test/cake.jpg".into()];
        with_image.draft.keywords = vec!["old".into()];
        let source = MemorySource::with(vec![with_image, record("page-2", "スコーン")]);
        let options = SyncOptions {
            generate_keywords: true,
            ..Default::default()
        };

        let report = sync_catalog(&pool, &source, &generator(), &options)
            .await
            .unwrap();
        assert!(report.results[0].keywords_generated);
        assert!(!report.results[1].keywords_generated);

        let cake = dishes::get_dish_by_notion_id(&pool, "page-1").await.unwrap().unwrap();
        assert!(!cake.keywords.contains(&"old".to_string()));
        assert!(cake.keywords.contains(&"cake".to_string()));
    }

    #[tokio::test]
    async fn test_delete_by_id_archives_cms_record() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::with(vec![record("page-1", "プリン")]);
        sync_catalog(&pool, &source, &generator(), &SyncOptions::default())
            .await
            .unwrap();
        let dish = dishes::get_dish_by_notion_id(&pool, "page-1").await.unwrap().unwrap();

        let outcome = remove_dish(&pool, Some(&source), DeleteTarget::Id(dish.id))
            .await
            .unwrap();

        assert!(outcome.deleted_from_store);
        assert!(outcome.archived_in_cms);
        assert_eq!(*source.archived.lock().unwrap(), vec!["page-1".to_string()]);
        assert!(dishes::get_dish(&pool, dish.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_survives_archive_failure() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource {
            fail_archive: true,
            ..MemorySource::with(vec![record("page-1", "プリン")])
        };
        sync_catalog(&pool, &source, &generator(), &SyncOptions::default())
            .await
            .unwrap();

        let outcome = remove_dish(&pool, Some(&source), DeleteTarget::ExternalId("page-1".into()))
            .await
            .unwrap();
        assert!(outcome.deleted_from_store);
        assert!(!outcome.archived_in_cms);
    }

    #[tokio::test]
    async fn test_delete_unknown_dish_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = remove_dish(&pool, None, DeleteTarget::Id(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(cafe_common::Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_mirrors_new_record() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::default();

        let outcome = create_and_mirror(&pool, &source, DishDraft::new("レモンタルト", "デザート"))
            .await
            .unwrap();

        assert_eq!(outcome.record.external_id, "page-1");
        assert_eq!(outcome.dish.notion_id.as_deref(), Some("page-1"));
        assert_eq!(outcome.dish.name, "レモンタルト");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft() {
        let pool = init_memory_database().await.unwrap();
        let source = MemorySource::default();
        let err = create_and_mirror(&pool, &source, DishDraft::new("", "デザート"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(cafe_common::Error::InvalidInput(_))));
        assert!(source.records.lock().unwrap().is_empty());
    }
}
