use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use vesper_core::{
    normalize_category, ContentItem, ContentStore, DispatchRecord, DispatchStatus, ItemOrigin,
    Mode, UsageRecord,
};

/// Per-category counts, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: String,
    pub items: i64,
    pub unused: i64,
}

/// Category-partitioned content plus the append-only usage and dispatch logs.
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: Pool<Sqlite>,
}

impl SqliteContentStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true);
        // One connection: every read-modify-write goes through the same handle
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to open content database: {}", db_path.as_ref().display())
            })?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                category_key TEXT NOT NULL,
                text TEXT NOT NULL,
                origin TEXT NOT NULL DEFAULT 'seed',
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create content_items table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                category_key TEXT NOT NULL,
                text TEXT NOT NULL,
                used_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create usage_records table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dispatch_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rule TEXT NOT NULL,
                mode TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create dispatch_log table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_category ON content_items(category_key)")
            .execute(&self.pool)
            .await
            .context("Failed to create content_items index")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_usage_category ON usage_records(category_key)")
            .execute(&self.pool)
            .await
            .context("Failed to create usage_records index")?;

        Ok(())
    }

    /// Item and unused counts for every category that has items.
    pub async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        let rows = sqlx::query(
            r#"
            SELECT MIN(i.category) AS category,
                   COUNT(*) AS items,
                   SUM(CASE WHEN EXISTS (
                       SELECT 1 FROM usage_records u
                       WHERE u.category_key = i.category_key AND u.text = i.text
                   ) THEN 0 ELSE 1 END) AS unused
            FROM content_items i
            GROUP BY i.category_key
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read category stats")?;

        Ok(rows
            .iter()
            .map(|r| CategoryStats {
                category: r.get("category"),
                items: r.get("items"),
                unused: r.get("unused"),
            })
            .collect())
    }

    /// Most recent dispatches first.
    pub async fn recent_dispatches(&self, limit: i64) -> Result<Vec<DispatchRecord>> {
        let rows = sqlx::query(
            "SELECT rule, mode, status, timestamp FROM dispatch_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read dispatch log")?;

        Ok(rows
            .iter()
            .map(|r| {
                let mode: String = r.get("mode");
                let status: String = r.get("status");
                DispatchRecord {
                    rule: r.get("rule"),
                    timestamp: from_unix(r.get("timestamp")),
                    mode: Mode::parse_label(&mode).unwrap_or_default(),
                    status: if status == "Completed" {
                        DispatchStatus::Completed
                    } else {
                        DispatchStatus::Failed
                    },
                }
            })
            .collect())
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn list_items(&self, category: &str) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(
            "SELECT category, text, origin FROM content_items WHERE category_key = ? ORDER BY id",
        )
        .bind(normalize_category(category))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list content items")?;

        Ok(rows
            .iter()
            .map(|r| {
                let origin: String = r.get("origin");
                ContentItem {
                    category: r.get("category"),
                    text: r.get("text"),
                    origin: ItemOrigin::parse(&origin),
                }
            })
            .collect())
    }

    async fn append_item(&self, category: &str, text: &str, origin: ItemOrigin) -> Result<()> {
        sqlx::query(
            "INSERT INTO content_items (category, category_key, text, origin, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(category.trim())
        .bind(normalize_category(category))
        .bind(text)
        .bind(origin.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append content item")?;
        Ok(())
    }

    async fn list_usage(&self, category: &str) -> Result<Vec<UsageRecord>> {
        let rows = sqlx::query(
            "SELECT category, text, used_at FROM usage_records WHERE category_key = ? ORDER BY id",
        )
        .bind(normalize_category(category))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list usage records")?;

        Ok(rows
            .iter()
            .map(|r| UsageRecord {
                category: r.get("category"),
                text: r.get("text"),
                timestamp: from_unix(r.get("used_at")),
            })
            .collect())
    }

    async fn append_usage(&self, category: &str, text: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO usage_records (category, category_key, text, used_at) VALUES (?, ?, ?, ?)",
        )
        .bind(category.trim())
        .bind(normalize_category(category))
        .bind(text)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append usage record")?;
        Ok(())
    }

    async fn append_dispatch(&self, record: &DispatchRecord) -> Result<()> {
        let status = match record.status {
            DispatchStatus::Completed => "Completed",
            DispatchStatus::Failed => "Failed",
        };
        sqlx::query("INSERT INTO dispatch_log (rule, mode, status, timestamp) VALUES (?, ?, ?, ?)")
            .bind(&record.rule)
            .bind(record.mode.as_str())
            .bind(status)
            .bind(record.timestamp.timestamp())
            .execute(&self.pool)
            .await
            .context("Failed to append dispatch log entry")?;
        Ok(())
    }
}
