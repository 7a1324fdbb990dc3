//! Balance snapshots per (client, period), served through the tiered
//! cache and recomputed from the entry batch on miss.

use std::collections::BTreeMap;
use std::sync::Arc;

use engine_core::error::AppError;
use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::models::{AccountBalance, BalanceSnapshot, LedgerEntry};
use crate::services::cache::{balance_key, TieredCache};
use crate::services::store::{StoreError, TableStore};

pub struct BalanceService {
    cache: Arc<TieredCache>,
    store: Option<Arc<dyn TableStore>>,
}

impl BalanceService {
    pub fn new(cache: Arc<TieredCache>, store: Option<Arc<dyn TableStore>>) -> Self {
        Self { cache, store }
    }

    /// Pure rollup of a client's entries for one period.
    ///
    /// A non-empty period selects entries whose date falls in that
    /// `YYYY-MM` month; the empty period aggregates everything, including
    /// undated entries.
    pub fn compute_snapshot(
        client_id: &str,
        period: &str,
        entries: &[LedgerEntry],
    ) -> BalanceSnapshot {
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut entry_count = 0usize;
        let mut accounts: BTreeMap<String, AccountBalance> = BTreeMap::new();

        for entry in entries {
            if entry.client_id != client_id {
                continue;
            }
            if !period.is_empty() {
                let in_period = entry
                    .date
                    .map(|d| d.format("%Y-%m").to_string() == period)
                    .unwrap_or(false);
                if !in_period {
                    continue;
                }
            }

            total_debit += entry.debit;
            total_credit += entry.credit;
            entry_count += 1;

            let account = accounts
                .entry(entry.account_number.clone())
                .or_insert_with(|| AccountBalance {
                    account_number: entry.account_number.clone(),
                    account_name: entry.account_name.clone(),
                    total_debit: Decimal::ZERO,
                    total_credit: Decimal::ZERO,
                    balance: Decimal::ZERO,
                });
            account.total_debit += entry.debit;
            account.total_credit += entry.credit;
            account.balance = account.total_debit - account.total_credit;
        }

        BalanceSnapshot {
            client_id: client_id.to_string(),
            period: period.to_string(),
            total_debit,
            total_credit,
            balance: total_debit - total_credit,
            entry_count,
            accounts: accounts.into_values().collect(),
        }
    }

    /// Serve a snapshot: cache hit first, recompute and write through on
    /// miss. The consulted period is remembered per client, best-effort.
    #[instrument(skip(self, entries), fields(client_id = %client_id, period = %period))]
    pub async fn snapshot(
        &self,
        client_id: &str,
        period: &str,
        entries: &[LedgerEntry],
    ) -> Result<BalanceSnapshot, AppError> {
        if client_id.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "client_id is required"
            )));
        }

        let key = balance_key(client_id, period);

        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_value::<BalanceSnapshot>(cached) {
                Ok(snapshot) => {
                    self.remember_period(client_id, period).await;
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(key, error = %e, "Discarding malformed cached snapshot");
                }
            }
        }

        let snapshot = Self::compute_snapshot(client_id, period, entries);
        match serde_json::to_value(&snapshot) {
            Ok(value) => self.cache.set(&key, &value).await,
            Err(e) => warn!(key, error = %e, "Snapshot not cacheable"),
        }
        self.remember_period(client_id, period).await;

        Ok(snapshot)
    }

    /// Last period consulted for a client, when the backend remembers one.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn last_period(&self, client_id: &str) -> Result<Option<String>, AppError> {
        let store = match &self.store {
            Some(store) => store,
            None => return Ok(None),
        };
        match store.get_last_period(client_id).await {
            Ok(period) => Ok(period),
            Err(StoreError::Unavailable(msg)) => {
                warn!(client_id, error = %msg, "Last-period store unavailable");
                Ok(None)
            }
            Err(StoreError::Query(msg)) => {
                Err(AppError::DatabaseError(anyhow::anyhow!(msg)))
            }
        }
    }

    /// Drop cached snapshots for a client (one period, or all of them).
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn invalidate(&self, client_id: &str, period: Option<&str>) {
        self.cache.clear(client_id, period).await;
    }

    async fn remember_period(&self, client_id: &str, period: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if period.is_empty() {
            return;
        }
        if let Err(e) = store.set_last_period(client_id, period).await {
            warn!(client_id, period, error = %e, "Last period not remembered");
        }
    }
}
