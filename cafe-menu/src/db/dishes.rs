//! Dish persistence
//!
//! List columns hold JSON arrays; timestamps are RFC 3339 UTC with
//! microseconds so text order equals time order.

use cafe_common::{Dish, DishDraft, Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

const DISH_COLUMNS: &str = "id, notion_id, name, name_en, category, price, description, \
     chef_comment, recommendation, pairing_suggestion, ingredients, allergens, keywords, \
     visual_keywords, image_urls, calories, available, seasonal, popular, created_at, updated_at";

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct DishFilter {
    pub category: Option<String>,
    pub available: Option<bool>,
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}

fn list_json(list: &[String]) -> Result<String> {
    Ok(serde_json::to_string(list)?)
}

fn parse_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn dish_from_row(row: &SqliteRow) -> Result<Dish> {
    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Invalid dish id '{}': {}", id_str, e)))?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Dish {
        id,
        notion_id: row.try_get("notion_id")?,
        name: row.try_get("name")?,
        name_en: row.try_get("name_en")?,
        category: row.try_get("category")?,
        price: row.try_get("price")?,
        description: row.try_get("description")?,
        chef_comment: row.try_get("chef_comment")?,
        recommendation: row.try_get("recommendation")?,
        pairing_suggestion: row.try_get("pairing_suggestion")?,
        ingredients: parse_list(row, "ingredients")?,
        allergens: parse_list(row, "allergens")?,
        keywords: parse_list(row, "keywords")?,
        visual_keywords: parse_list(row, "visual_keywords")?,
        image_urls: parse_list(row, "image_urls")?,
        calories: row.try_get("calories")?,
        available: row.try_get("available")?,
        seasonal: row.try_get("seasonal")?,
        popular: row.try_get("popular")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert a new dish
pub async fn insert_dish(pool: &SqlitePool, dish: &Dish) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO dishes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        DISH_COLUMNS
    ))
    .bind(dish.id.to_string())
    .bind(&dish.notion_id)
    .bind(&dish.name)
    .bind(&dish.name_en)
    .bind(&dish.category)
    .bind(dish.price)
    .bind(&dish.description)
    .bind(&dish.chef_comment)
    .bind(&dish.recommendation)
    .bind(&dish.pairing_suggestion)
    .bind(list_json(&dish.ingredients)?)
    .bind(list_json(&dish.allergens)?)
    .bind(list_json(&dish.keywords)?)
    .bind(list_json(&dish.visual_keywords)?)
    .bind(list_json(&dish.image_urls)?)
    .bind(dish.calories)
    .bind(dish.available)
    .bind(dish.seasonal)
    .bind(dish.popular)
    .bind(timestamp(&dish.created_at))
    .bind(timestamp(&dish.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or update the dish mirrored from a CMS record (last write wins)
///
/// The local id and `created_at` survive updates.
pub async fn upsert_by_notion_id(pool: &SqlitePool, draft: DishDraft) -> Result<Dish> {
    let draft = draft.normalized();
    draft.validate_mirrored()?;
    let Some(notion_id) = draft.notion_id.clone() else {
        return Err(Error::InvalidInput(
            "Mirrored dish requires an external id".to_string(),
        ));
    };

    let dish = draft.into_dish();
    sqlx::query(&format!(
        r#"
        INSERT INTO dishes ({})
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(notion_id) DO UPDATE SET
            name = excluded.name,
            name_en = excluded.name_en,
            category = excluded.category,
            price = excluded.price,
            description = excluded.description,
            chef_comment = excluded.chef_comment,
            recommendation = excluded.recommendation,
            pairing_suggestion = excluded.pairing_suggestion,
            ingredients = excluded.ingredients,
            allergens = excluded.allergens,
            keywords = excluded.keywords,
            visual_keywords = excluded.visual_keywords,
            image_urls = excluded.image_urls,
            calories = excluded.calories,
            available = excluded.available,
            seasonal = excluded.seasonal,
            popular = excluded.popular,
            updated_at = excluded.updated_at
        "#,
        DISH_COLUMNS
    ))
    .bind(dish.id.to_string())
    .bind(&dish.notion_id)
    .bind(&dish.name)
    .bind(&dish.name_en)
    .bind(&dish.category)
    .bind(dish.price)
    .bind(&dish.description)
    .bind(&dish.chef_comment)
    .bind(&dish.recommendation)
    .bind(&dish.pairing_suggestion)
    .bind(list_json(&dish.ingredients)?)
    .bind(list_json(&dish.allergens)?)
    .bind(list_json(&dish.keywords)?)
    .bind(list_json(&dish.visual_keywords)?)
    .bind(list_json(&dish.image_urls)?)
    .bind(dish.calories)
    .bind(dish.available)
    .bind(dish.seasonal)
    .bind(dish.popular)
    .bind(timestamp(&dish.created_at))
    .bind(timestamp(&dish.updated_at))
    .execute(pool)
    .await?;

    get_dish_by_notion_id(pool, &notion_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Upserted dish {} not found", notion_id)))
}

/// Load a dish by id
pub async fn get_dish(pool: &SqlitePool, id: Uuid) -> Result<Option<Dish>> {
    let row = sqlx::query(&format!("SELECT {} FROM dishes WHERE id = ?", DISH_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(dish_from_row).transpose()
}

/// Load a dish by the id of its CMS record
pub async fn get_dish_by_notion_id(pool: &SqlitePool, notion_id: &str) -> Result<Option<Dish>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM dishes WHERE notion_id = ?",
        DISH_COLUMNS
    ))
    .bind(notion_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(dish_from_row).transpose()
}

/// List dishes, newest first
pub async fn list_dishes(pool: &SqlitePool, filter: &DishFilter) -> Result<Vec<Dish>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM dishes
        WHERE (?1 IS NULL OR category = ?1)
          AND (?2 IS NULL OR available = ?2)
        ORDER BY created_at DESC, name ASC
        "#,
        DISH_COLUMNS
    ))
    .bind(&filter.category)
    .bind(filter.available)
    .fetch_all(pool)
    .await?;

    rows.iter().map(dish_from_row).collect()
}

/// Write every mutable column of an existing dish
pub async fn update_dish(pool: &SqlitePool, dish: &Dish) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE dishes SET
            name = ?, name_en = ?, category = ?, price = ?, description = ?,
            chef_comment = ?, recommendation = ?, pairing_suggestion = ?,
            ingredients = ?, allergens = ?, keywords = ?, visual_keywords = ?, image_urls = ?,
            calories = ?, available = ?, seasonal = ?, popular = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&dish.name)
    .bind(&dish.name_en)
    .bind(&dish.category)
    .bind(dish.price)
    .bind(&dish.description)
    .bind(&dish.chef_comment)
    .bind(&dish.recommendation)
    .bind(&dish.pairing_suggestion)
    .bind(list_json(&dish.ingredients)?)
    .bind(list_json(&dish.allergens)?)
    .bind(list_json(&dish.keywords)?)
    .bind(list_json(&dish.visual_keywords)?)
    .bind(list_json(&dish.image_urls)?)
    .bind(dish.calories)
    .bind(dish.available)
    .bind(dish.seasonal)
    .bind(dish.popular)
    .bind(timestamp(&dish.updated_at))
    .bind(dish.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Dish {}", dish.id)));
    }
    Ok(())
}

/// Replace a dish's keyword lists
pub async fn update_keywords(
    pool: &SqlitePool,
    id: Uuid,
    keywords: &[String],
    visual_keywords: &[String],
) -> Result<()> {
    let keywords = cafe_common::keywords::normalize_keywords(keywords);
    let visual_keywords = cafe_common::keywords::normalize_keywords(visual_keywords);

    let result = sqlx::query(
        "UPDATE dishes SET keywords = ?, visual_keywords = ?, updated_at = ? WHERE id = ?",
    )
    .bind(list_json(&keywords)?)
    .bind(list_json(&visual_keywords)?)
    .bind(timestamp(&Utc::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Dish {}", id)));
    }
    Ok(())
}

/// Whether any dish has exactly this name
pub async fn name_exists(pool: &SqlitePool, name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dishes WHERE name = ?)")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Delete a dish; returns whether a row was removed
pub async fn delete_dish(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM dishes WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete the dish mirrored from a CMS record; returns whether a row was removed
pub async fn delete_by_notion_id(pool: &SqlitePool, notion_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM dishes WHERE notion_id = ?")
        .bind(notion_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_common::db::init_memory_database;

    fn mirrored(notion_id: &str, name: &str) -> DishDraft {
        let mut draft = DishDraft::new(name, "デザート");
        draft.notion_id = Some(notion_id.to_string());
        draft
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let pool = init_memory_database().await.unwrap();
        let mut draft = DishDraft::new("チーズケーキ", "デザート");
        draft.price = Some(550);
        draft.keywords = vec!["cake".into(), "チーズ".into()];
        let dish = draft.into_dish();

        insert_dish(&pool, &dish).await.unwrap();
        let loaded = get_dish(&pool, dish.id).await.unwrap().unwrap();

        assert_eq!(loaded.name, "チーズケーキ");
        assert_eq!(loaded.price, Some(550));
        assert_eq!(loaded.keywords, dish.keywords);
        // stored with microsecond precision
        assert_eq!((loaded.created_at - dish.created_at).num_milliseconds(), 0);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_external_id() {
        let pool = init_memory_database().await.unwrap();

        let first = upsert_by_notion_id(&pool, mirrored("page-1", "プリン")).await.unwrap();
        let second = upsert_by_notion_id(&pool, mirrored("page-1", "焼きプリン"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "焼きプリン");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(list_dishes(&pool, &DishFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_external_id() {
        let pool = init_memory_database().await.unwrap();
        let err = upsert_by_notion_id(&pool, DishDraft::new("プリン", "デザート"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let pool = init_memory_database().await.unwrap();

        let older = DishDraft::new("ブレンドコーヒー", "ドリンク").into_dish();
        let mut newer = DishDraft::new("カフェラテ", "ドリンク").into_dish();
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        let mut cake = DishDraft::new("ショートケーキ", "デザート").into_dish();
        cake.available = false;

        for dish in [&older, &newer, &cake] {
            insert_dish(&pool, dish).await.unwrap();
        }

        let drinks = list_dishes(
            &pool,
            &DishFilter {
                category: Some("ドリンク".into()),
                available: None,
            },
        )
        .await
        .unwrap();
        let names: Vec<&str> = drinks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["カフェラテ", "ブレンドコーヒー"]);

        let unavailable = list_dishes(
            &pool,
            &DishFilter {
                category: None,
                available: Some(false),
            },
        )
        .await
        .unwrap();
        assert_eq!(unavailable.len(), 1);
        assert_eq!(unavailable[0].name, "ショートケーキ");
    }

    #[tokio::test]
    async fn test_update_keywords_deduplicates() {
        let pool = init_memory_database().await.unwrap();
        let dish = DishDraft::new("抹茶ラテ", "ドリンク").into_dish();
        insert_dish(&pool, &dish).await.unwrap();

        update_keywords(
            &pool,
            dish.id,
            &["matcha".into(), "Matcha".into(), "抹茶".into()],
            &["緑".into()],
        )
        .await
        .unwrap();

        let loaded = get_dish(&pool, dish.id).await.unwrap().unwrap();
        assert_eq!(loaded.keywords, vec!["matcha", "抹茶"]);
        assert_eq!(loaded.visual_keywords, vec!["緑"]);
    }

    #[tokio::test]
    async fn test_update_missing_dish_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let dish = DishDraft::new("抹茶ラテ", "ドリンク").into_dish();
        assert!(matches!(
            update_dish(&pool, &dish).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_by_either_id() {
        let pool = init_memory_database().await.unwrap();
        let mirrored = upsert_by_notion_id(&pool, mirrored("page-9", "タルト")).await.unwrap();
        let local = DishDraft::new("スコーン", "デザート").into_dish();
        insert_dish(&pool, &local).await.unwrap();

        assert!(delete_by_notion_id(&pool, "page-9").await.unwrap());
        assert!(delete_dish(&pool, local.id).await.unwrap());
        assert!(!delete_dish(&pool, mirrored.id).await.unwrap());
        assert!(list_dishes(&pool, &DishFilter::default()).await.unwrap().is_empty());
    }
}
