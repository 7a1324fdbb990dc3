//! Locally persisted tier: one JSON file per key under a directory.
//!
//! The survivor of the original browser-storage tier: durable on the
//! machine, shared by nothing, last write wins.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::{CacheTier, TierError};

pub struct LocalFileTier {
    base_path: PathBuf,
}

impl LocalFileTier {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, TierError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .await
                .map_err(|e| TierError::Unavailable(e.to_string()))?;
        }
        Ok(Self { base_path })
    }

    /// Keys carry separator characters, so file names are the hex-encoded
    /// key bytes (reversible for enumeration).
    fn file_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", hex::encode(key)))
    }

    fn key_from_file(name: &str) -> Option<String> {
        let encoded = name.strip_suffix(".json")?;
        let bytes = hex::decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[async_trait]
impl CacheTier for LocalFileTier {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, TierError> {
        let path = self.file_for(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| TierError::Malformed(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TierError::Unavailable(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), TierError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| TierError::Malformed(e.to_string()))?;
        fs::write(self.file_for(key), bytes)
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), TierError> {
        match fs::remove_file(self.file_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TierError::Unavailable(e.to_string())),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, TierError> {
        let mut dir = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))?;

        let mut keys = Vec::new();
        while let Some(dirent) = dir
            .next_entry()
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))?
        {
            if let Some(name) = dirent.file_name().to_str() {
                if let Some(key) = Self::key_from_file(name) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
