pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Entity type for daily performance snapshots, keyed `{profile_id}/{date}`.
pub const SNAPSHOT_ENTITY: &str = "performance_snapshot";
/// Entity type for trader stats, keyed by trader id.
pub const TRADER_ENTITY: &str = "trader_stats";

/// Row access by `(entity_type, key)`.
///
/// Implementations must make `upsert` and `insert_if_absent` atomic per key.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, entity: &str, key: &str) -> anyhow::Result<Option<Value>>;

    async fn upsert(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<()>;

    /// Insert only when the key is free. Returns `false` if a row already existed.
    async fn insert_if_absent(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<bool>;

    /// All rows of `entity` whose key starts with `prefix`, ordered by key.
    async fn list_by_prefix(&self, entity: &str, prefix: &str) -> anyhow::Result<Vec<(String, Value)>>;
}

/// Serialize and upsert a typed record.
pub async fn put<T: Serialize>(store: &dyn Store, entity: &str, key: &str, record: &T) -> anyhow::Result<()> {
    store.upsert(entity, key, serde_json::to_value(record)?).await
}

/// Load every typed record under a prefix. Rows that fail to decode are
/// skipped with a warning so one bad row cannot block the rest.
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn Store,
    entity: &str,
    prefix: &str,
) -> anyhow::Result<Vec<T>> {
    let rows = store.list_by_prefix(entity, prefix).await?;
    let mut out = Vec::with_capacity(rows.len());
    for (key, value) in rows {
        match serde_json::from_value::<T>(value) {
            Ok(record) => out.push(record),
            Err(e) => {
                tracing::warn!(entity = entity, key = %key, error = %e, "Skipping undecodable row");
            }
        }
    }
    Ok(out)
}

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}
