//! Balance snapshot computed per (client, period) and served through the
//! tiered cache.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-account rollup inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_number: String,
    pub account_name: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
}

/// Aggregated view of a client's ledger for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub client_id: String,
    /// Accounting period, e.g. "2024-03". Empty means all periods.
    pub period: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
    pub entry_count: usize,
    pub accounts: Vec<AccountBalance>,
}
