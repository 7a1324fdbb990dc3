//! Reconciliation Engine - ledger import normalization, content-based
//! deduplication, anomaly classification and tiered caching.

pub mod config;
pub mod models;
pub mod services;
pub mod startup;
