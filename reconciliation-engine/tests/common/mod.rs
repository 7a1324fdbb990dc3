//! Common test utilities for reconciliation-engine integration tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Once;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use reconciliation_engine::models::{LedgerEntry, LedgerKind};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,reconciliation_engine=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date literal")
}

/// Builder for test ledger entries.
pub struct EntryBuilder {
    entry: LedgerEntry,
}

impl EntryBuilder {
    fn with_kind(kind: LedgerKind) -> Self {
        Self {
            entry: LedgerEntry {
                entry_id: Uuid::new_v4(),
                client_id: "client-1".to_string(),
                kind,
                date: None,
                account_number: "411000".to_string(),
                account_name: "Dupont SARL".to_string(),
                description: "Ecriture comptable".to_string(),
                debit: Decimal::ZERO,
                credit: Decimal::ZERO,
                balance: Decimal::ZERO,
                reference: String::new(),
                created_utc: Utc::now(),
                is_imported: true,
                ai_meta: None,
            },
        }
    }

    pub fn client() -> Self {
        Self::with_kind(LedgerKind::Client {
            invoice_number: None,
        })
    }

    pub fn supplier() -> Self {
        Self::with_kind(LedgerKind::Supplier { bill_number: None })
    }

    pub fn misc() -> Self {
        Self::with_kind(LedgerKind::Misc { category: None })
    }

    pub fn client_id(mut self, client_id: &str) -> Self {
        self.entry.client_id = client_id.to_string();
        self
    }

    pub fn account_name(mut self, name: &str) -> Self {
        self.entry.account_name = name.to_string();
        self
    }

    pub fn account_number(mut self, number: &str) -> Self {
        self.entry.account_number = number.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.entry.description = description.to_string();
        self
    }

    pub fn reference(mut self, reference: &str) -> Self {
        self.entry.reference = reference.to_string();
        self
    }

    pub fn date(mut self, value: &str) -> Self {
        self.entry.date = Some(date(value));
        self
    }

    pub fn debit(mut self, amount: &str) -> Self {
        self.entry.debit = dec(amount);
        self.entry.balance = self.entry.debit - self.entry.credit;
        self
    }

    pub fn credit(mut self, amount: &str) -> Self {
        self.entry.credit = dec(amount);
        self.entry.balance = self.entry.debit - self.entry.credit;
        self
    }

    pub fn invoice_number(mut self, number: &str) -> Self {
        self.entry.kind = LedgerKind::Client {
            invoice_number: Some(number.to_string()),
        };
        self
    }

    pub fn bill_number(mut self, number: &str) -> Self {
        self.entry.kind = LedgerKind::Supplier {
            bill_number: Some(number.to_string()),
        };
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.entry.kind = LedgerKind::Misc {
            category: Some(category.to_string()),
        };
        self
    }

    pub fn build(self) -> LedgerEntry {
        self.entry
    }
}
