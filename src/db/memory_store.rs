use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::Store;

/// Process-local store. State lives as long as the last clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<BTreeMap<(String, String), Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, entity: &str, key: &str) -> anyhow::Result<Option<Value>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(&(entity.to_string(), key.to_string())).cloned())
    }

    async fn upsert(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().await;
        rows.insert((entity.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn insert_if_absent(&self, entity: &str, key: &str, value: Value) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().await;
        let id = (entity.to_string(), key.to_string());
        if rows.contains_key(&id) {
            return Ok(false);
        }
        rows.insert(id, value);
        Ok(true)
    }

    async fn list_by_prefix(&self, entity: &str, prefix: &str) -> anyhow::Result<Vec<(String, Value)>> {
        let rows = self.rows.lock().await;
        let start = (entity.to_string(), prefix.to_string());
        Ok(rows
            .range(start..)
            .take_while(|((e, k), _)| e == entity && k.starts_with(prefix))
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}
