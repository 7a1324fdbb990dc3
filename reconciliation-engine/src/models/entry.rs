//! Ledger entry model shared by the import, dedup and analysis passes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger family an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerType {
    Client,
    Supplier,
    Misc,
}

impl LedgerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Supplier => "supplier",
            Self::Misc => "misc",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "client" => Self::Client,
            "supplier" => Self::Supplier,
            _ => Self::Misc,
        }
    }
}

impl std::fmt::Display for LedgerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific discriminant payload. Every entry carries exactly one
/// variant, so the analyzer can match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerKind {
    Client { invoice_number: Option<String> },
    Supplier { bill_number: Option<String> },
    Misc { category: Option<String> },
}

impl LedgerKind {
    pub fn ledger_type(&self) -> LedgerType {
        match self {
            Self::Client { .. } => LedgerType::Client,
            Self::Supplier { .. } => LedgerType::Supplier,
            Self::Misc { .. } => LedgerType::Misc,
        }
    }

    /// The kind-specific field value, when present.
    pub fn discriminant(&self) -> Option<&str> {
        match self {
            Self::Client { invoice_number } => invoice_number.as_deref(),
            Self::Supplier { bill_number } => bill_number.as_deref(),
            Self::Misc { category } => category.as_deref(),
        }
    }
}

/// Severity attached by the analyzer for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspiciousLevel {
    Low,
    Medium,
    High,
}

impl SuspiciousLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Display-only annotation attached post-hoc by the analyzer.
/// Never persisted as ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMeta {
    pub suspicious_level: SuspiciousLevel,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

/// One imported accounting movement against an account, tied to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub client_id: String,
    pub kind: LedgerKind,
    pub date: Option<NaiveDate>,
    pub account_number: String,
    pub account_name: String,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
    pub reference: String,
    pub created_utc: DateTime<Utc>,
    pub is_imported: bool,
    pub ai_meta: Option<AiMeta>,
}

impl LedgerEntry {
    pub fn ledger_type(&self) -> LedgerType {
        self.kind.ledger_type()
    }

    /// Movement amount. By convention one of debit/credit is zero.
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }

    /// Entries with neither a debit nor a credit are classification no-ops.
    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }
}
