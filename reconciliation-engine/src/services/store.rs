//! Backend table access behind a trait, so the persisted tier can be
//! swapped between Postgres and the in-memory implementation used by
//! tests and degraded environments.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{LedgerComment, NewComment};

/// Storage-level failure. `Unavailable` means the underlying table is
/// structurally missing or unreachable; callers degrade instead of
/// propagating it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Row-level client over the backend tables.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn upsert_balance_cache(
        &self,
        cache_key: &str,
        client_id: &str,
        period: &str,
        data: &Value,
    ) -> Result<(), StoreError>;

    async fn get_balance_cache(&self, cache_key: &str) -> Result<Option<Value>, StoreError>;

    async fn delete_balance_cache(&self, cache_key: &str) -> Result<(), StoreError>;

    async fn list_balance_keys(&self) -> Result<Vec<String>, StoreError>;

    async fn get_last_period(&self, client_id: &str) -> Result<Option<String>, StoreError>;

    async fn set_last_period(&self, client_id: &str, period: &str) -> Result<(), StoreError>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<LedgerComment, StoreError>;

    async fn list_comments(
        &self,
        client_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LedgerComment>, StoreError>;
}

/// In-memory table store. Doubles as the test backend and as the teaching
/// example for the trait; `available = false` simulates a missing table.
pub struct MemoryTableStore {
    available: bool,
    balance: Mutex<HashMap<String, (String, String, Value)>>,
    last_period: Mutex<HashMap<String, String>>,
    comments: Mutex<Vec<LedgerComment>>,
}

impl MemoryTableStore {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            balance: Mutex::new(HashMap::new()),
            last_period: Mutex::new(HashMap::new()),
            comments: Mutex::new(Vec::new()),
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "relation does not exist".to_string(),
            ))
        }
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn upsert_balance_cache(
        &self,
        cache_key: &str,
        client_id: &str,
        period: &str,
        data: &Value,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.balance
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .insert(
                cache_key.to_string(),
                (client_id.to_string(), period.to_string(), data.clone()),
            );
        Ok(())
    }

    async fn get_balance_cache(&self, cache_key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        Ok(self
            .balance
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .get(cache_key)
            .map(|(_, _, data)| data.clone()))
    }

    async fn delete_balance_cache(&self, cache_key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.balance
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .remove(cache_key);
        Ok(())
    }

    async fn list_balance_keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let mut keys: Vec<String> = self
            .balance
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .keys()
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_last_period(&self, client_id: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(self
            .last_period
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .get(client_id)
            .cloned())
    }

    async fn set_last_period(&self, client_id: &str, period: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.last_period
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .insert(client_id.to_string(), period.to_string());
        Ok(())
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<LedgerComment, StoreError> {
        self.check_available()?;
        let stored = LedgerComment {
            id: Uuid::new_v4(),
            entry_id: comment.entry_id.clone(),
            client_id: comment.client_id.clone(),
            ledger_type: comment.ledger_type.as_str().to_string(),
            author: comment.author.clone(),
            author_type: comment.author_type.as_str().to_string(),
            content: comment.content.clone(),
            priority: comment.priority.as_str().to_string(),
            is_internal: comment.is_internal,
            created_utc: Utc::now(),
        };
        self.comments
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .push(stored.clone());
        Ok(stored)
    }

    async fn list_comments(
        &self,
        client_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LedgerComment>, StoreError> {
        self.check_available()?;
        Ok(self
            .comments
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?
            .iter()
            .filter(|c| c.client_id == client_id && c.entry_id == entry_id)
            .cloned()
            .collect())
    }
}
