//! Reconciliation analyzer: three independent classification passes over
//! an immutable entry batch, scoped to one client and one ledger type.
//!
//! Pure functions throughout: recomputing against the same batch yields
//! identical membership, so results are derived on demand and never
//! persisted.

use std::collections::HashMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::models::{AnalysisResult, LedgerEntry, LedgerKind, LedgerType};
use crate::services::metrics;
use crate::services::signature::canonical_text;

/// Settlement tolerance: one currency unit absorbs rounding drift.
const SETTLEMENT_TOLERANCE: Decimal = Decimal::ONE;

/// Amount above which a round supplier movement is suspicious on its own.
fn high_value_threshold() -> Decimal {
    Decimal::from(10_000)
}

/// Reference prefixes accepted as payment justification, per ledger family.
const CLIENT_REFERENCE_PREFIXES: [&str; 4] = ["FAC", "REG", "CHQ", "VIR"];
const SUPPLIER_REFERENCE_PREFIXES: [&str; 6] = ["FACT", "REG", "CHQ", "VIR", "BON", "PAY"];

const MIN_REFERENCE_LEN: usize = 5;
const VAGUE_DESCRIPTION_LEN: usize = 10;

/// Run the three passes over a batch.
///
/// Entries of another ledger type and entries with neither a debit nor a
/// credit are classification no-ops.
#[instrument(skip(entries), fields(ledger_type = %ledger_type, entries = entries.len()))]
pub fn analyze(ledger_type: LedgerType, entries: &[LedgerEntry]) -> AnalysisResult {
    let batch: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| e.ledger_type() == ledger_type && !e.is_zero())
        .collect();

    let result = AnalysisResult {
        unsolved: unsolved_pass(ledger_type, &batch),
        missing_justification: justification_pass(ledger_type, &batch),
        suspicious: suspicious_pass(ledger_type, &batch),
    };

    metrics::ANALYSIS_RUNS
        .with_label_values(&[ledger_type.as_str()])
        .inc();
    metrics::ANALYSIS_FLAGS
        .with_label_values(&["unsolved"])
        .inc_by(result.unsolved.len() as f64);
    metrics::ANALYSIS_FLAGS
        .with_label_values(&["missing_justification"])
        .inc_by(result.missing_justification.len() as f64);
    metrics::ANALYSIS_FLAGS
        .with_label_values(&["suspicious"])
        .inc_by(result.suspicious.len() as f64);

    result
}

/// Cumulative invoiced/paid totals per counterparty.
#[derive(Default)]
struct Totals {
    invoiced: Decimal,
    paid: Decimal,
}

impl Totals {
    fn outstanding(&self) -> Decimal {
        self.invoiced - self.paid
    }
}

/// Unsolved invoices/bills: an invoice (debit) entry is unsolved when its
/// counterparty has been invoiced more than paid, beyond the tolerance.
///
/// Supplier bills carrying a bill number settle against payments whose
/// reference matches that number; bills without one fall back to the
/// counterparty-level totals.
fn unsolved_pass(ledger_type: LedgerType, batch: &[&LedgerEntry]) -> Vec<uuid::Uuid> {
    if ledger_type == LedgerType::Misc {
        return Vec::new();
    }

    let mut by_counterparty: HashMap<String, Totals> = HashMap::new();
    let mut by_bill_number: HashMap<String, Totals> = HashMap::new();

    for entry in batch {
        let counterparty = canonical_text(&entry.account_name);
        let totals = by_counterparty.entry(counterparty).or_default();
        totals.invoiced += entry.debit;
        totals.paid += entry.credit;

        if ledger_type == LedgerType::Supplier {
            if entry.debit > Decimal::ZERO {
                if let LedgerKind::Supplier {
                    bill_number: Some(number),
                } = &entry.kind
                {
                    by_bill_number
                        .entry(canonical_text(number))
                        .or_default()
                        .invoiced += entry.debit;
                }
            }
            if entry.credit > Decimal::ZERO && !entry.reference.trim().is_empty() {
                by_bill_number
                    .entry(canonical_text(&entry.reference))
                    .or_default()
                    .paid += entry.credit;
            }
        }
    }

    let mut unsolved = Vec::new();
    for entry in batch {
        if entry.debit.is_zero() {
            continue;
        }

        let outstanding = match (&entry.kind, ledger_type) {
            (
                LedgerKind::Supplier {
                    bill_number: Some(number),
                },
                LedgerType::Supplier,
            ) => by_bill_number
                .get(&canonical_text(number))
                .map(Totals::outstanding)
                .unwrap_or(entry.debit),
            _ => by_counterparty
                .get(&canonical_text(&entry.account_name))
                .map(Totals::outstanding)
                .unwrap_or(Decimal::ZERO),
        };

        if outstanding > SETTLEMENT_TOLERANCE {
            unsolved.push(entry.entry_id);
        }
    }
    unsolved
}

/// Whether a reference is an acceptable justification for a payment.
fn has_valid_reference(reference: &str, prefixes: &[&str]) -> bool {
    let normalized = reference.trim().to_uppercase();
    normalized.chars().count() >= MIN_REFERENCE_LEN
        && prefixes.iter().any(|p| normalized.starts_with(p))
}

/// Missing justification: credit (payment) entries whose reference does
/// not carry a known prefix. Supplier payments are only flagged when they
/// also lack a bill number.
fn justification_pass(ledger_type: LedgerType, batch: &[&LedgerEntry]) -> Vec<uuid::Uuid> {
    let prefixes: &[&str] = match ledger_type {
        LedgerType::Client => &CLIENT_REFERENCE_PREFIXES,
        LedgerType::Supplier => &SUPPLIER_REFERENCE_PREFIXES,
        LedgerType::Misc => return Vec::new(),
    };

    let mut flagged = Vec::new();
    for entry in batch {
        if entry.credit.is_zero() {
            continue;
        }
        if has_valid_reference(&entry.reference, prefixes) {
            continue;
        }
        if ledger_type == LedgerType::Supplier {
            if let LedgerKind::Supplier {
                bill_number: Some(_),
            } = &entry.kind
            {
                continue;
            }
        }
        flagged.push(entry.entry_id);
    }
    flagged
}

fn is_round_hundred(amount: Decimal) -> bool {
    !amount.is_zero() && (amount % Decimal::from(100)).is_zero()
}

fn falls_on_weekend(entry: &LedgerEntry) -> bool {
    // A missing date never satisfies the weekend condition.
    entry
        .date
        .map(|d| matches!(d.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun))
        .unwrap_or(false)
}

fn has_vague_description(entry: &LedgerEntry) -> bool {
    entry.description.trim().chars().count() < VAGUE_DESCRIPTION_LEN
}

/// Suspicious entries.
///
/// Client and miscellaneous ledgers: a vague description paired with a
/// round multiple of 100 or a weekend date. Supplier ledgers: a round
/// high-value amount, or a weekend movement with a vague description.
fn suspicious_pass(ledger_type: LedgerType, batch: &[&LedgerEntry]) -> Vec<uuid::Uuid> {
    let mut flagged = Vec::new();
    for entry in batch {
        let amount = entry.amount();
        let round = is_round_hundred(amount);
        let weekend = falls_on_weekend(entry);
        let vague = has_vague_description(entry);

        let suspicious = match ledger_type {
            LedgerType::Supplier => {
                (round && amount > high_value_threshold()) || (weekend && vague)
            }
            LedgerType::Client | LedgerType::Misc => vague && (round || weekend),
        };

        if suspicious {
            flagged.push(entry.entry_id);
        }
    }
    flagged
}

/// The reasons an entry was considered suspicious, for display annotation.
pub fn suspicious_reasons(ledger_type: LedgerType, entry: &LedgerEntry) -> Vec<String> {
    let mut reasons = Vec::new();
    let amount = entry.amount();

    if is_round_hundred(amount) {
        if ledger_type == LedgerType::Supplier && amount > high_value_threshold() {
            reasons.push("round high-value amount".to_string());
        } else if ledger_type != LedgerType::Supplier {
            reasons.push("round amount".to_string());
        }
    }
    if falls_on_weekend(entry) {
        reasons.push("weekend movement".to_string());
    }
    if has_vague_description(entry) {
        reasons.push("vague description".to_string());
    }
    reasons
}
