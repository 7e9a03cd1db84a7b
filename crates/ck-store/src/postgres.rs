//! Postgres-backed creation store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ck_models::{
    Creation, CreationContent, CreationSummary, CreationType, NewCreation, PublishedCreation,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::CreationStore;

const CREATION_COLUMNS: &str =
    "id, user_id, prompt, content, type AS kind, publish, likes, created_at";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection URL
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Pool acquire timeout
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Create config from environment variables.
    ///
    /// Returns `Ok(None)` when `DATABASE_URL` is not set.
    pub fn from_env() -> StoreResult<Option<Self>> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };

        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(v) => v
                .parse()
                .map_err(|_| StoreError::config("DATABASE_MAX_CONNECTIONS must be an integer"))?,
            Err(_) => 10,
        };

        Ok(Some(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        }))
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct CreationRow {
    id: Uuid,
    user_id: String,
    prompt: String,
    content: String,
    kind: String,
    publish: bool,
    likes: Vec<String>,
    created_at: DateTime<Utc>,
}

fn parse_kind(id: Uuid, tag: &str) -> StoreResult<CreationType> {
    tag.parse::<CreationType>()
        .map_err(|e| StoreError::corrupt_row(id, e))
}

impl TryFrom<CreationRow> for Creation {
    type Error = StoreError;

    fn try_from(row: CreationRow) -> StoreResult<Self> {
        let kind = parse_kind(row.id, &row.kind)?;
        let content = CreationContent::from_stored(kind, &row.content)
            .map_err(|e| StoreError::corrupt_row(row.id, e))?;

        Ok(Creation {
            id: row.id,
            user_id: row.user_id,
            prompt: row.prompt,
            content,
            kind,
            publish: row.publish,
            likes: row.likes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: Uuid,
    prompt: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for CreationSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> StoreResult<Self> {
        Ok(CreationSummary {
            id: row.id,
            kind: parse_kind(row.id, &row.kind)?,
            prompt: row.prompt,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Creation store on a Postgres pool.
#[derive(Clone)]
pub struct PgCreationStore {
    pool: PgPool,
}

impl PgCreationStore {
    /// Connect and apply pending migrations.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "Connected to creation database");

        Ok(Self { pool })
    }
}

#[async_trait]
impl CreationStore for PgCreationStore {
    async fn insert(&self, creation: NewCreation) -> StoreResult<Creation> {
        let sql = format!(
            "INSERT INTO creations (id, user_id, prompt, content, type) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CREATION_COLUMNS}"
        );

        let row: CreationRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&creation.user_id)
            .bind(&creation.prompt)
            .bind(creation.content.to_stored())
            .bind(creation.kind().as_str())
            .fetch_one(&self.pool)
            .await?;

        debug!(creation_id = %row.id, kind = %row.kind, "Inserted creation");
        row.try_into()
    }

    async fn get_owned(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Creation>> {
        let sql =
            format!("SELECT {CREATION_COLUMNS} FROM creations WHERE id = $1 AND user_id = $2");

        let row: Option<CreationRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Creation::try_from).transpose()
    }

    async fn delete_owned(&self, id: Uuid, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM creations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_publish(&self, id: Uuid, user_id: &str) -> StoreResult<Option<bool>> {
        let published: Option<bool> = sqlx::query_scalar(
            "UPDATE creations SET publish = NOT publish \
             WHERE id = $1 AND user_id = $2 RETURNING publish",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(published)
    }

    async fn toggle_like(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Vec<String>>> {
        // Single statement so concurrent toggles never duplicate an entry.
        let likes: Option<Vec<String>> = sqlx::query_scalar(
            "UPDATE creations SET likes = CASE \
                 WHEN $2 = ANY(likes) THEN array_remove(likes, $2) \
                 ELSE array_append(likes, $2) \
             END \
             WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(likes)
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CreationSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT id, prompt, type AS kind, created_at FROM creations \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CreationSummary::try_from).collect()
    }

    async fn count_for_user(&self, user_id: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_published(&self) -> StoreResult<Vec<PublishedCreation>> {
        let sql = format!(
            "SELECT {CREATION_COLUMNS} FROM creations WHERE publish ORDER BY created_at DESC"
        );

        let rows: Vec<CreationRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| Creation::try_from(row).map(PublishedCreation::from))
            .collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
