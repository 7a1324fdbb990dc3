//! Cache tier adapters.
//!
//! Each tier implements the same read/write contract and reports failure
//! as data (`TierError`), so the tiered cache makes fallback decisions on
//! values instead of catching exceptions.

pub mod backend;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use backend::BackendTier;
pub use local::LocalFileTier;
pub use memory::MemoryTier;

/// Tier-level failure. Recovered locally by falling back to the next
/// tier; never propagated to engine callers.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("tier unavailable: {0}")]
    Unavailable(String),

    #[error("malformed cache payload: {0}")]
    Malformed(String),
}

/// One storage layer in the cache hierarchy.
#[async_trait]
pub trait CacheTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Value>, TierError>;

    async fn set(&self, key: &str, value: &Value) -> Result<(), TierError>;

    async fn remove(&self, key: &str) -> Result<(), TierError>;

    /// All keys currently held by this tier.
    async fn list_keys(&self) -> Result<Vec<String>, TierError>;
}
