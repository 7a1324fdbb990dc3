//! External collaborator interfaces.
//!
//! The engine consumes a text-generation service and a document/storage
//! service. Both are trait-based so the backends can be swapped; only the
//! interfaces and mock implementations live here.

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{LedgerEntry, LedgerType};

/// Error type for collaborator operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Upper bounds on text leaving the engine boundary.
pub const MAX_NAME_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 300;
pub const MAX_REFERENCE_LEN: usize = 64;

static PROMPT_ALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N} .,;:'/()€$%+-]").expect("valid prompt filter"));

/// Sanitize a free-text field before it reaches the text-generation
/// collaborator. Length-capping and pattern-filtering are a hard
/// precondition of every outbound call, not an optional nicety.
pub fn sanitize_prompt_field(input: &str, max_len: usize) -> String {
    let filtered = PROMPT_ALLOWED.replace_all(input.trim(), " ");
    let mut collapsed = String::with_capacity(filtered.len());
    let mut pending_space = false;
    for c in filtered.chars() {
        if c.is_whitespace() {
            pending_space = !collapsed.is_empty();
            continue;
        }
        if pending_space {
            collapsed.push(' ');
            pending_space = false;
        }
        collapsed.push(c);
    }
    collapsed.chars().take(max_len).collect()
}

/// Context handed to the generator when drafting a justification message.
/// Build via [`JustificationContext::sanitized`] so every field passes the
/// prompt filter.
#[derive(Debug, Clone)]
pub struct JustificationContext {
    pub client_name: String,
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub reference: String,
    pub entry_type: LedgerType,
}

impl JustificationContext {
    pub fn sanitized(entry: &LedgerEntry) -> Self {
        Self {
            client_name: sanitize_prompt_field(&entry.account_name, MAX_NAME_LEN),
            amount: entry.amount().round_dp(2),
            date: entry.date,
            description: sanitize_prompt_field(&entry.description, MAX_DESCRIPTION_LEN),
            reference: sanitize_prompt_field(&entry.reference, MAX_REFERENCE_LEN),
            entry_type: entry.ledger_type(),
        }
    }
}

/// Black-box text generator used to draft justification messages and
/// review suggestions.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_justification(
        &self,
        context: &JustificationContext,
    ) -> Result<String, ProviderError>;

    async fn generate_suggestions(
        &self,
        entries: &[LedgerEntry],
    ) -> Result<Vec<String>, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// A stored document handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub path: String,
    pub url: String,
}

/// A listed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub name: String,
    pub size: usize,
    pub created_utc: DateTime<Utc>,
    pub url: String,
}

/// Document/storage collaborator. The engine only reads and writes ledger
/// and comment records itself; files go through this interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredDocument, ProviderError>;

    async fn list(&self, path: &str) -> Result<Vec<DocumentInfo>, ProviderError>;
}
