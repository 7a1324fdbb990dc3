//! Tiered cache manager: memory, local-file and backend tiers behind one
//! read/write contract with transparent fallback.
//!
//! Instances are constructed per context and passed by reference; there is
//! no process-wide cache state.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::services::metrics;
use crate::services::tiers::{BackendTier, CacheTier, LocalFileTier, MemoryTier, TierError};

/// Composite key for balance snapshots: `"{client_id}::{period}"`.
/// An empty period means the all-periods snapshot.
pub fn balance_key(client_id: &str, period: &str) -> String {
    format!("{client_id}::{period}")
}

/// Parse a balance key back into `(client_id, period)`.
pub fn parse_balance_key(key: &str) -> Option<(String, String)> {
    let (client_id, period) = key.split_once("::")?;
    if client_id.is_empty() {
        return None;
    }
    Some((client_id.to_string(), period.to_string()))
}

/// Outcome of a one-shot local-to-backend migration.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

pub struct TieredCache {
    memory: MemoryTier,
    local: Option<LocalFileTier>,
    backend: Option<BackendTier>,
}

impl TieredCache {
    pub fn new(local: Option<LocalFileTier>, backend: Option<BackendTier>) -> Self {
        Self {
            memory: MemoryTier::new(),
            local,
            backend,
        }
    }

    /// Memory-only cache, the degradation floor.
    pub fn memory_only() -> Self {
        Self::new(None, None)
    }

    fn tiers(&self) -> Vec<&dyn CacheTier> {
        let mut tiers: Vec<&dyn CacheTier> = vec![&self.memory];
        if let Some(local) = &self.local {
            tiers.push(local);
        }
        if let Some(backend) = &self.backend {
            tiers.push(backend);
        }
        tiers
    }

    fn note_failure(tier: &dyn CacheTier, operation: &str, err: &TierError) {
        metrics::record_cache_operation(tier.name(), operation, "error");
        warn!(tier = tier.name(), operation, error = %err, "Cache tier degraded");
    }

    /// Read through the hierarchy. The first hit populates every faster
    /// tier before returning.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Option<Value> {
        let tiers = self.tiers();

        for (depth, tier) in tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(value)) => {
                    metrics::record_cache_operation(tier.name(), "get", "hit");
                    for faster in &tiers[..depth] {
                        if let Err(e) = faster.set(key, &value).await {
                            Self::note_failure(*faster, "populate", &e);
                        }
                    }
                    return Some(value);
                }
                Ok(None) => {
                    metrics::record_cache_operation(tier.name(), "get", "miss");
                }
                Err(e) => Self::note_failure(*tier, "get", &e),
            }
        }
        None
    }

    /// Write to every tier. The memory tier always succeeds; persisted
    /// tier failures are logged and swallowed (fail-soft).
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &Value) {
        for tier in self.tiers() {
            match tier.set(key, value).await {
                Ok(()) => metrics::record_cache_operation(tier.name(), "set", "ok"),
                Err(e) => Self::note_failure(tier, "set", &e),
            }
        }
    }

    /// Remove the matching entries from every tier it can reach.
    /// Tier-level failures are swallowed (best-effort).
    #[instrument(skip(self))]
    pub async fn clear(&self, client_id: &str, period: Option<&str>) {
        match period {
            Some(period) => {
                let key = balance_key(client_id, period);
                for tier in self.tiers() {
                    match tier.remove(&key).await {
                        Ok(()) => metrics::record_cache_operation(tier.name(), "clear", "ok"),
                        Err(e) => Self::note_failure(tier, "clear", &e),
                    }
                }
            }
            None => {
                let prefix = format!("{client_id}::");
                for tier in self.tiers() {
                    let keys = match tier.list_keys().await {
                        Ok(keys) => keys,
                        Err(e) => {
                            Self::note_failure(tier, "clear", &e);
                            continue;
                        }
                    };
                    for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
                        match tier.remove(key).await {
                            Ok(()) => metrics::record_cache_operation(tier.name(), "clear", "ok"),
                            Err(e) => Self::note_failure(tier, "clear", &e),
                        }
                    }
                }
            }
        }
    }

    /// One-shot migration of locally persisted snapshots into the backend
    /// tier. Per-key failures are logged and skipped; the operation runs to
    /// completion and reports counts rather than aborting.
    ///
    /// Not safe to run concurrently with writers on the same keys: there is
    /// no cross-process lock, last write wins.
    #[instrument(skip(self))]
    pub async fn migrate_local_to_backend(&self) -> MigrationReport {
        let mut report = MigrationReport::default();

        let (local, backend) = match (&self.local, &self.backend) {
            (Some(local), Some(backend)) => (local, backend),
            _ => {
                info!("Migration skipped: both persisted tiers must be configured");
                return report;
            }
        };

        let keys = match local.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Migration aborted: local tier unavailable");
                return report;
            }
        };

        for key in keys {
            if parse_balance_key(&key).is_none() {
                metrics::record_migration_key("skipped");
                report.skipped += 1;
                continue;
            }

            let value = match local.get(&key).await {
                Ok(Some(value)) => value,
                Ok(None) => {
                    metrics::record_migration_key("skipped");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(key, error = %e, "Migration: unreadable local entry skipped");
                    metrics::record_migration_key("skipped");
                    report.skipped += 1;
                    continue;
                }
            };

            match backend.set(&key, &value).await {
                Ok(()) => {
                    metrics::record_migration_key("migrated");
                    report.migrated += 1;
                }
                Err(e) => {
                    warn!(key, error = %e, "Migration: backend upsert failed, key skipped");
                    metrics::record_migration_key("skipped");
                    report.skipped += 1;
                }
            }
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            "Local-to-backend migration completed"
        );
        report
    }
}
