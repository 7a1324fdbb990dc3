//! Mock collaborator implementations for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    DocumentInfo, DocumentStore, JustificationContext, ProviderError, StoredDocument,
    TextGenerator,
};
use crate::models::LedgerEntry;

/// Mock text generator for testing.
pub struct MockTextGenerator {
    enabled: bool,
}

impl MockTextGenerator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate_justification(
        &self,
        context: &JustificationContext,
    ) -> Result<String, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text generator not enabled".to_string(),
            ));
        }

        Ok(format!(
            "Veuillez justifier le mouvement de {} pour {} ({})",
            context.amount,
            context.client_name,
            context.entry_type.as_str()
        ))
    }

    async fn generate_suggestions(
        &self,
        entries: &[LedgerEntry],
    ) -> Result<Vec<String>, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text generator not enabled".to_string(),
            ));
        }

        Ok(entries
            .iter()
            .map(|e| format!("Review entry {} against its supporting documents", e.entry_id))
            .collect())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text generator not enabled".to_string(),
            ))
        }
    }
}

/// Mock document store keeping uploads in memory.
#[derive(Default)]
pub struct MockDocumentStore {
    documents: Mutex<HashMap<String, DocumentInfo>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredDocument, ProviderError> {
        let url = format!("mock://documents/{path}");
        let info = DocumentInfo {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            size: bytes.len(),
            created_utc: Utc::now(),
            url: url.clone(),
        };
        self.documents
            .lock()
            .map_err(|e| ProviderError::ApiError(e.to_string()))?
            .insert(path.to_string(), info);
        Ok(StoredDocument {
            path: path.to_string(),
            url,
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<DocumentInfo>, ProviderError> {
        let documents = self
            .documents
            .lock()
            .map_err(|e| ProviderError::ApiError(e.to_string()))?;
        let mut listed: Vec<DocumentInfo> = documents
            .iter()
            .filter(|(stored_path, _)| stored_path.starts_with(path))
            .map(|(_, info)| info.clone())
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
}
