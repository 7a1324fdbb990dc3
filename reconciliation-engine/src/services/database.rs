//! Postgres access for the backend-persisted tier and comment threads.

use async_trait::async_trait;
use engine_core::error::AppError;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{LedgerComment, NewComment};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{StoreError, TableStore};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// A structurally missing table (undefined_table, SQLSTATE 42P01) is a
/// degraded-mode condition, not a query bug.
fn map_store_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("42P01") {
            return StoreError::Unavailable(db_err.to_string());
        }
    }
    match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        _ => StoreError::Query(e.to_string()),
    }
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "reconciliation-engine"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Create the backend tables when absent. A table that is still
    /// missing at runtime degrades the tier instead of failing callers, so
    /// schema setup is advisory rather than a startup requirement.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS balance_cache (
                cache_key TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                period TEXT NOT NULL,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS balance_last_period (
                client_id TEXT PRIMARY KEY,
                period TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ledger_comments (
                id UUID PRIMARY KEY,
                entry_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                ledger_type TEXT NOT NULL,
                author TEXT NOT NULL,
                author_type TEXT NOT NULL,
                content TEXT NOT NULL,
                priority TEXT NOT NULL,
                is_internal BOOLEAN NOT NULL DEFAULT FALSE,
                created_utc TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_ledger_comments_entry
                ON ledger_comments (client_id, entry_id)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Schema setup failed: {}", e))
                })?;
        }

        info!("Backend schema ensured");
        Ok(())
    }
}

#[async_trait]
impl TableStore for Database {
    #[instrument(skip(self, data), fields(cache_key = %cache_key))]
    async fn upsert_balance_cache(
        &self,
        cache_key: &str,
        client_id: &str,
        period: &str,
        data: &Value,
    ) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_balance_cache"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO balance_cache (cache_key, client_id, period, data, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (cache_key)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(cache_key)
        .bind(client_id)
        .bind(period)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(cache_key = %cache_key))]
    async fn get_balance_cache(&self, cache_key: &str) -> Result<Option<Value>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_balance_cache"])
            .start_timer();

        let data: Option<Value> =
            sqlx::query_scalar("SELECT data FROM balance_cache WHERE cache_key = $1")
                .bind(cache_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(data)
    }

    #[instrument(skip(self), fields(cache_key = %cache_key))]
    async fn delete_balance_cache(&self, cache_key: &str) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_balance_cache"])
            .start_timer();

        sqlx::query("DELETE FROM balance_cache WHERE cache_key = $1")
            .bind(cache_key)
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_balance_keys(&self) -> Result<Vec<String>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_balance_keys"])
            .start_timer();

        let keys: Vec<String> =
            sqlx::query_scalar("SELECT cache_key FROM balance_cache ORDER BY cache_key")
                .fetch_all(&self.pool)
                .await
                .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(keys)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn get_last_period(&self, client_id: &str) -> Result<Option<String>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_last_period"])
            .start_timer();

        let period: Option<String> =
            sqlx::query_scalar("SELECT period FROM balance_last_period WHERE client_id = $1")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(period)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn set_last_period(&self, client_id: &str, period: &str) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_last_period"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO balance_last_period (client_id, period, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (client_id)
            DO UPDATE SET period = EXCLUDED.period, updated_at = NOW()
            "#,
        )
        .bind(client_id)
        .bind(period)
        .execute(&self.pool)
        .await
        .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, comment), fields(client_id = %comment.client_id, entry_id = %comment.entry_id))]
    async fn insert_comment(&self, comment: &NewComment) -> Result<LedgerComment, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_comment"])
            .start_timer();

        let stored = sqlx::query_as::<_, LedgerComment>(
            r#"
            INSERT INTO ledger_comments (id, entry_id, client_id, ledger_type, author, author_type, content, priority, is_internal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, entry_id, client_id, ledger_type, author, author_type, content, priority, is_internal, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&comment.entry_id)
        .bind(&comment.client_id)
        .bind(comment.ledger_type.as_str())
        .bind(&comment.author)
        .bind(comment.author_type.as_str())
        .bind(&comment.content)
        .bind(comment.priority.as_str())
        .bind(comment.is_internal)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_error)?;

        timer.observe_duration();
        info!(comment_id = %stored.id, "Comment stored");

        Ok(stored)
    }

    #[instrument(skip(self), fields(client_id = %client_id, entry_id = %entry_id))]
    async fn list_comments(
        &self,
        client_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LedgerComment>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_comments"])
            .start_timer();

        let comments = sqlx::query_as::<_, LedgerComment>(
            r#"
            SELECT id, entry_id, client_id, ledger_type, author, author_type, content, priority, is_internal, created_utc
            FROM ledger_comments
            WHERE client_id = $1 AND entry_id = $2
            ORDER BY created_utc
            "#,
        )
        .bind(client_id)
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;

        timer.observe_duration();
        Ok(comments)
    }
}
