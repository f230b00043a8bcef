//! Database initialization
//!
//! Creates the database file on first run and applies the (idempotent) schema.
//! List-valued dish columns are stored as JSON text.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open or create the database at `db_path` and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
///
/// Every pooled connection to `sqlite::memory:` is a distinct database, so the
/// pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes if they don't exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_dishes_table(pool).await?;
    Ok(())
}

async fn create_dishes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dishes (
            id TEXT PRIMARY KEY,
            notion_id TEXT UNIQUE,
            name TEXT NOT NULL,
            name_en TEXT,
            category TEXT NOT NULL,
            price INTEGER,
            description TEXT NOT NULL DEFAULT '',
            chef_comment TEXT,
            recommendation TEXT,
            pairing_suggestion TEXT,
            ingredients TEXT NOT NULL DEFAULT '[]',
            allergens TEXT NOT NULL DEFAULT '[]',
            keywords TEXT NOT NULL DEFAULT '[]',
            visual_keywords TEXT NOT NULL DEFAULT '[]',
            image_urls TEXT NOT NULL DEFAULT '[]',
            calories INTEGER,
            available INTEGER NOT NULL DEFAULT 1,
            seasonal INTEGER NOT NULL DEFAULT 0,
            popular INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_dishes_category ON dishes(category)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_dishes_created_at ON dishes(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
