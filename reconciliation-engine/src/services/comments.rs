//! Comment threads on ledger entries: backend-persisted with an in-memory
//! per-(client, entry) lookup cache.

use std::sync::Arc;

use dashmap::DashMap;
use engine_core::error::AppError;
use tracing::{instrument, warn};

use crate::models::{LedgerComment, NewComment};
use crate::services::store::{StoreError, TableStore};

/// In-memory lookup key: `"{client_id}|{entry_id}"`. Not a wire format.
fn comment_key(client_id: &str, entry_id: &str) -> String {
    format!("{client_id}|{entry_id}")
}

pub struct CommentService {
    store: Option<Arc<dyn TableStore>>,
    lookup: DashMap<String, Vec<LedgerComment>>,
}

impl CommentService {
    pub fn new(store: Option<Arc<dyn TableStore>>) -> Self {
        Self {
            store,
            lookup: DashMap::new(),
        }
    }

    /// Post a comment. An unavailable backend degrades to the in-memory
    /// thread instead of failing the caller.
    #[instrument(skip(self, comment), fields(client_id = %comment.client_id, entry_id = %comment.entry_id))]
    pub async fn add_comment(&self, comment: NewComment) -> Result<LedgerComment, AppError> {
        if comment.client_id.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "client_id is required"
            )));
        }
        if comment.entry_id.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("entry_id is required")));
        }

        let stored = match &self.store {
            Some(store) => match store.insert_comment(&comment).await {
                Ok(stored) => stored,
                Err(StoreError::Unavailable(msg)) => {
                    warn!(error = %msg, "Comment store unavailable, keeping in memory");
                    Self::local_comment(&comment)
                }
                Err(StoreError::Query(msg)) => {
                    return Err(AppError::DatabaseError(anyhow::anyhow!(msg)));
                }
            },
            None => Self::local_comment(&comment),
        };

        let key = comment_key(&stored.client_id, &stored.entry_id);
        self.lookup.entry(key).or_default().push(stored.clone());

        Ok(stored)
    }

    /// Thread for one entry: lookup cache first, backend on miss.
    #[instrument(skip(self), fields(client_id = %client_id, entry_id = %entry_id))]
    pub async fn comments_for(
        &self,
        client_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LedgerComment>, AppError> {
        let key = comment_key(client_id, entry_id);

        if let Some(cached) = self.lookup.get(&key) {
            return Ok(cached.value().clone());
        }

        let store = match &self.store {
            Some(store) => store,
            None => return Ok(Vec::new()),
        };

        match store.list_comments(client_id, entry_id).await {
            Ok(comments) => {
                self.lookup.insert(key, comments.clone());
                Ok(comments)
            }
            Err(StoreError::Unavailable(msg)) => {
                warn!(error = %msg, "Comment store unavailable, serving empty thread");
                Ok(Vec::new())
            }
            Err(StoreError::Query(msg)) => Err(AppError::DatabaseError(anyhow::anyhow!(msg))),
        }
    }

    /// Drop the cached thread for one entry.
    pub fn invalidate(&self, client_id: &str, entry_id: &str) {
        self.lookup.remove(&comment_key(client_id, entry_id));
    }

    fn local_comment(comment: &NewComment) -> LedgerComment {
        LedgerComment {
            id: uuid::Uuid::new_v4(),
            entry_id: comment.entry_id.clone(),
            client_id: comment.client_id.clone(),
            ledger_type: comment.ledger_type.as_str().to_string(),
            author: comment.author.clone(),
            author_type: comment.author_type.as_str().to_string(),
            content: comment.content.clone(),
            priority: comment.priority.as_str().to_string(),
            is_internal: comment.is_internal,
            created_utc: chrono::Utc::now(),
        }
    }
}
