//! Integration tests for balance snapshots served through the tiered cache.

mod common;

use std::sync::Arc;

use common::{dec, EntryBuilder};

use reconciliation_engine::models::LedgerEntry;
use reconciliation_engine::services::balance::BalanceService;
use reconciliation_engine::services::cache::TieredCache;
use reconciliation_engine::services::store::{MemoryTableStore, TableStore};

fn sample_entries() -> Vec<LedgerEntry> {
    vec![
        EntryBuilder::client()
            .account_number("411000")
            .account_name("Dupont SARL")
            .date("2024-03-04")
            .debit("1000")
            .build(),
        EntryBuilder::client()
            .account_number("411000")
            .account_name("Dupont SARL")
            .date("2024-03-18")
            .credit("600")
            .reference("REG-2024-01")
            .build(),
        EntryBuilder::client()
            .account_number("411200")
            .account_name("Martin SA")
            .date("2024-04-02")
            .debit("250")
            .build(),
        EntryBuilder::client()
            .client_id("client-2")
            .date("2024-03-05")
            .debit("9999")
            .build(),
    ]
}

#[test]
fn compute_snapshot_rolls_up_per_account() {
    let entries = sample_entries();
    let snapshot = BalanceService::compute_snapshot("client-1", "", &entries);

    assert_eq!(snapshot.entry_count, 3);
    assert_eq!(snapshot.total_debit, dec("1250"));
    assert_eq!(snapshot.total_credit, dec("600"));
    assert_eq!(snapshot.balance, dec("650"));
    assert_eq!(snapshot.accounts.len(), 2);
    assert_eq!(snapshot.accounts[0].account_number, "411000");
    assert_eq!(snapshot.accounts[0].balance, dec("400"));
    assert_eq!(snapshot.accounts[1].account_number, "411200");
    assert_eq!(snapshot.accounts[1].balance, dec("250"));
}

#[test]
fn compute_snapshot_filters_by_period() {
    let entries = sample_entries();
    let march = BalanceService::compute_snapshot("client-1", "2024-03", &entries);

    assert_eq!(march.entry_count, 2);
    assert_eq!(march.balance, dec("400"));

    let april = BalanceService::compute_snapshot("client-1", "2024-04", &entries);
    assert_eq!(april.entry_count, 1);
    assert_eq!(april.balance, dec("250"));
}

#[tokio::test]
async fn snapshot_is_served_from_cache_on_the_second_call() {
    common::init_tracing();
    let cache = Arc::new(TieredCache::memory_only());
    let service = BalanceService::new(cache, None);

    let entries = sample_entries();
    let first = service
        .snapshot("client-1", "2024-03", &entries)
        .await
        .expect("snapshot");
    assert_eq!(first.balance, dec("400"));

    // A different batch with the same key: the cached view wins.
    let second = service
        .snapshot("client-1", "2024-03", &[])
        .await
        .expect("snapshot");
    assert_eq!(second, first);

    // After invalidation the snapshot is recomputed.
    service.invalidate("client-1", Some("2024-03")).await;
    let third = service
        .snapshot("client-1", "2024-03", &[])
        .await
        .expect("snapshot");
    assert_eq!(third.entry_count, 0);
}

#[tokio::test]
async fn consulted_period_is_remembered() {
    let store: Arc<MemoryTableStore> = Arc::new(MemoryTableStore::new(true));
    let cache = Arc::new(TieredCache::memory_only());
    let service = BalanceService::new(cache, Some(store.clone() as Arc<dyn TableStore>));

    service
        .snapshot("client-1", "2024-03", &sample_entries())
        .await
        .expect("snapshot");

    assert_eq!(
        service.last_period("client-1").await.expect("last period"),
        Some("2024-03".to_string())
    );
}

#[tokio::test]
async fn unavailable_last_period_store_degrades_to_none() {
    let store: Arc<MemoryTableStore> = Arc::new(MemoryTableStore::new(false));
    let cache = Arc::new(TieredCache::memory_only());
    let service = BalanceService::new(cache, Some(store as Arc<dyn TableStore>));

    let snapshot = service
        .snapshot("client-1", "2024-03", &sample_entries())
        .await
        .expect("snapshot survives the degraded store");
    assert_eq!(snapshot.balance, dec("400"));

    assert_eq!(service.last_period("client-1").await.expect("no error"), None);
}

#[tokio::test]
async fn blank_client_id_is_the_one_fatal_condition() {
    let service = BalanceService::new(Arc::new(TieredCache::memory_only()), None);
    let result = service.snapshot("  ", "2024-03", &[]).await;
    assert!(result.is_err());
}
