use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::Store;

/// Postgres-backed store over the `engine_state` table. Values are stored as
/// JSON text.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = super::init_pool(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get(&self, entity: &str, key: &str) -> anyhow::Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM engine_state WHERE entity_type = $1 AND key = $2",
        )
        .bind(entity)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((text,)) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO engine_state (entity_type, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (entity_type, key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(entity)
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO engine_state (entity_type, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (entity_type, key) DO NOTHING
            "#,
        )
        .bind(entity)
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_prefix(&self, entity: &str, prefix: &str) -> anyhow::Result<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT key, value FROM engine_state
            WHERE entity_type = $1 AND left(key, length($2)) = $2
            ORDER BY key
            "#,
        )
        .bind(entity)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, text)| Ok((key, serde_json::from_str(&text)?)))
            .collect()
    }
}
