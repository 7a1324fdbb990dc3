//! Backend-persisted tier: adapts the table store to the tier contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{CacheTier, TierError};
use crate::services::cache::parse_balance_key;
use crate::services::store::{StoreError, TableStore};

pub struct BackendTier {
    store: Arc<dyn TableStore>,
}

impl BackendTier {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }
}

impl From<StoreError> for TierError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => TierError::Unavailable(msg),
            StoreError::Query(msg) => TierError::Unavailable(msg),
        }
    }
}

#[async_trait]
impl CacheTier for BackendTier {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, TierError> {
        Ok(self.store.get_balance_cache(key).await?)
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), TierError> {
        let (client_id, period) = parse_balance_key(key)
            .ok_or_else(|| TierError::Malformed(format!("not a balance key: {key}")))?;
        self.store
            .upsert_balance_cache(key, &client_id, &period, value)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TierError> {
        self.store.delete_balance_cache(key).await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, TierError> {
        Ok(self.store.list_balance_keys().await?)
    }
}
