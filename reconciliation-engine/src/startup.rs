//! Engine assembly: wires configuration into tiers and services.

use std::sync::Arc;

use engine_core::error::AppError;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::services::balance::BalanceService;
use crate::services::cache::TieredCache;
use crate::services::comments::CommentService;
use crate::services::database::Database;
use crate::services::metrics::init_metrics;
use crate::services::store::TableStore;
use crate::services::tiers::{BackendTier, LocalFileTier};

/// Assembled engine state. One instance per context; nothing is shared at
/// process scope.
pub struct Engine {
    pub config: EngineConfig,
    pub db: Option<Arc<Database>>,
    pub cache: Arc<TieredCache>,
    pub balance: BalanceService,
    pub comments: CommentService,
}

impl Engine {
    /// Build the engine from configuration.
    ///
    /// Both persisted tiers are optional: without `DATABASE_URL` the
    /// backend tier is disabled, without `CACHE_LOCAL_DIR` the local tier
    /// is, and the engine still serves everything from memory.
    pub async fn build(config: EngineConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = match &config.database.url {
            Some(url) => {
                let database = Database::new(
                    url,
                    config.database.max_connections,
                    config.database.min_connections,
                )
                .await?;
                if let Err(e) = database.ensure_schema().await {
                    warn!(error = %e, "Backend schema setup failed, tier will degrade");
                }
                Some(Arc::new(database))
            }
            None => {
                info!("No DATABASE_URL configured, backend tier disabled");
                None
            }
        };

        let local = match &config.cache.local_dir {
            Some(dir) => match LocalFileTier::new(dir.clone()).await {
                Ok(tier) => Some(tier),
                Err(e) => {
                    warn!(error = %e, "Local tier unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        let store: Option<Arc<dyn TableStore>> =
            db.clone().map(|database| database as Arc<dyn TableStore>);
        let backend = store.clone().map(BackendTier::new);

        let cache = Arc::new(TieredCache::new(local, backend));
        let balance = BalanceService::new(cache.clone(), store.clone());
        let comments = CommentService::new(store);

        info!(
            service = %config.service_name,
            backend = db.is_some(),
            local = config.cache.local_dir.is_some(),
            "Reconciliation engine assembled"
        );

        Ok(Self {
            config,
            db,
            cache,
            balance,
            comments,
        })
    }
}
