//! Import normalization: maps heterogeneous spreadsheet rows onto
//! canonical ledger entries and runs the dedup pipeline over a batch.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use engine_core::error::FieldErrors;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{LedgerEntry, LedgerKind, LedgerType};
use crate::services::metrics;
use crate::services::signature;

/// Canonical field names resolved from column aliases.
pub const FIELD_CLIENT_ID: &str = "client_id";
pub const FIELD_DATE: &str = "date";
pub const FIELD_ACCOUNT_NUMBER: &str = "account_number";
pub const FIELD_ACCOUNT_NAME: &str = "account_name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_DEBIT: &str = "debit";
pub const FIELD_CREDIT: &str = "credit";
pub const FIELD_BALANCE: &str = "balance";
pub const FIELD_REFERENCE: &str = "reference";
pub const FIELD_INVOICE_NUMBER: &str = "invoice_number";
pub const FIELD_BILL_NUMBER: &str = "bill_number";
pub const FIELD_CATEGORY: &str = "category";

/// Ordered list of accepted header names per canonical field. The first
/// alias present in a row wins. Lookup is case- and accent-insensitive.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: Vec<(&'static str, Vec<&'static str>)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            aliases: vec![
                (
                    FIELD_CLIENT_ID,
                    vec!["client_id", "clientid", "client", "code client", "code_client"],
                ),
                (
                    FIELD_DATE,
                    vec!["date", "date ecriture", "date_ecriture", "date operation"],
                ),
                (
                    FIELD_ACCOUNT_NUMBER,
                    vec![
                        "account_number",
                        "compte",
                        "numero compte",
                        "numero_compte",
                        "n° compte",
                        "account",
                    ],
                ),
                (
                    FIELD_ACCOUNT_NAME,
                    vec![
                        "account_name",
                        "intitule",
                        "intitulé",
                        "libelle compte",
                        "nom compte",
                        "nom_compte",
                    ],
                ),
                (
                    FIELD_DESCRIPTION,
                    vec!["description", "libelle", "libellé", "designation", "label"],
                ),
                (FIELD_DEBIT, vec!["debit", "débit"]),
                (FIELD_CREDIT, vec!["credit", "crédit"]),
                (FIELD_BALANCE, vec!["balance", "solde"]),
                (
                    FIELD_REFERENCE,
                    vec!["reference", "référence", "ref", "piece", "pièce", "numero piece"],
                ),
                (
                    FIELD_INVOICE_NUMBER,
                    vec![
                        "invoice_number",
                        "numero facture",
                        "numero_facture",
                        "n° facture",
                        "facture",
                    ],
                ),
                (
                    FIELD_BILL_NUMBER,
                    vec![
                        "bill_number",
                        "numero facture fournisseur",
                        "facture fournisseur",
                        "n° facture fournisseur",
                        "facture",
                    ],
                ),
                (
                    FIELD_CATEGORY,
                    vec!["category", "categorie", "catégorie", "rubrique"],
                ),
            ],
        }
    }
}

impl AliasTable {
    /// Resolve a canonical field to the first alias present in the row.
    pub fn resolve<'a>(&self, row: &'a serde_json::Map<String, Value>, field: &str) -> Option<&'a Value> {
        let candidates = self
            .aliases
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, aliases)| aliases.as_slice())?;

        for alias in candidates {
            let wanted = signature::canonical_text(alias);
            for (key, value) in row {
                if signature::canonical_text(key) == wanted && !value.is_null() {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Trim, strip control characters and collapse internal whitespace.
pub fn sanitize_string(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    };

    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.trim().chars() {
        if c.is_control() {
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Coerce a loosely-typed cell to an amount.
///
/// Strips currency symbols and thousands separators and accepts a comma
/// decimal separator. Unparseable input defaults to zero rather than
/// failing the row. Sign is preserved; debit/credit columns take the
/// absolute value at the call site.
pub fn parse_amount(value: &Value) -> Decimal {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Decimal::ZERO,
    };

    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    // With both separators present the rightmost one is the decimal mark.
    if cleaned.contains('.') && cleaned.contains(',') {
        if cleaned.rfind('.') > cleaned.rfind(',') {
            cleaned = cleaned.replace(',', "");
        } else {
            cleaned = cleaned.replace('.', "").replace(',', ".");
        }
    } else if cleaned.contains(',') {
        cleaned = cleaned.replace(',', ".");
    }

    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Parse a calendar date over the accepted formats, `None` on failure.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = sanitize_string(value);
    if text.is_empty() {
        return None;
    }
    // ISO datetime cells keep their date part.
    let date_part = text.split('T').next().unwrap_or(&text);

    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// A row the normalizer refused, with the fields that failed.
#[derive(Debug)]
pub struct RejectedRow {
    pub index: usize,
    pub errors: FieldErrors,
}

/// Outcome of a full import run over a row batch.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: Vec<LedgerEntry>,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Normalize one raw row into a canonical entry.
///
/// Pure transform: no side effects, nothing dropped silently. A row
/// missing the mandatory `client_id` (or not shaped like an object) is
/// rejected with the failing fields listed.
pub fn normalize_row(
    row: &Value,
    ledger_type: LedgerType,
    aliases: &AliasTable,
) -> Result<LedgerEntry, FieldErrors> {
    let mut errors = FieldErrors::default();

    let object = match row.as_object() {
        Some(o) => o,
        None => {
            errors.push("row", "expected a key/value row");
            return Err(errors);
        }
    };

    let client_id = aliases
        .resolve(object, FIELD_CLIENT_ID)
        .map(sanitize_string)
        .unwrap_or_default();
    if client_id.is_empty() {
        errors.push(FIELD_CLIENT_ID, "missing mandatory identifier");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let resolve_text = |field: &str| {
        aliases
            .resolve(object, field)
            .map(sanitize_string)
            .unwrap_or_default()
    };
    let resolve_opt = |field: &str| {
        aliases
            .resolve(object, field)
            .map(sanitize_string)
            .filter(|s| !s.is_empty())
    };

    let debit = aliases
        .resolve(object, FIELD_DEBIT)
        .map(|v| parse_amount(v).abs())
        .unwrap_or(Decimal::ZERO);
    let credit = aliases
        .resolve(object, FIELD_CREDIT)
        .map(|v| parse_amount(v).abs())
        .unwrap_or(Decimal::ZERO);
    let balance = match aliases.resolve(object, FIELD_BALANCE) {
        Some(v) => parse_amount(v),
        None => debit - credit,
    };

    let kind = match ledger_type {
        LedgerType::Client => LedgerKind::Client {
            invoice_number: resolve_opt(FIELD_INVOICE_NUMBER),
        },
        LedgerType::Supplier => LedgerKind::Supplier {
            bill_number: resolve_opt(FIELD_BILL_NUMBER),
        },
        LedgerType::Misc => LedgerKind::Misc {
            category: resolve_opt(FIELD_CATEGORY),
        },
    };

    Ok(LedgerEntry {
        entry_id: Uuid::new_v4(),
        client_id,
        kind,
        date: aliases.resolve(object, FIELD_DATE).and_then(parse_date),
        account_number: resolve_text(FIELD_ACCOUNT_NUMBER),
        account_name: resolve_text(FIELD_ACCOUNT_NAME),
        description: resolve_text(FIELD_DESCRIPTION),
        debit,
        credit,
        balance,
        reference: resolve_text(FIELD_REFERENCE),
        created_utc: Utc::now(),
        is_imported: true,
        ai_meta: None,
    })
}

/// Normalize a batch and dedup it against previously seen signatures.
///
/// Duplicate rows are counted, not errored; rejected rows are returned to
/// the caller with their field errors.
#[instrument(skip(rows, aliases, existing_signatures), fields(ledger_type = %ledger_type, rows = rows.len()))]
pub fn run_import(
    ledger_type: LedgerType,
    rows: &[Value],
    aliases: &AliasTable,
    existing_signatures: &mut HashSet<String>,
) -> ImportReport {
    let mut normalized = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row, ledger_type, aliases) {
            Ok(entry) => normalized.push(entry),
            Err(errors) => {
                metrics::record_import_row("rejected");
                rejected.push(RejectedRow { index, errors });
            }
        }
    }

    let outcome = signature::dedup(normalized, existing_signatures);
    metrics::IMPORT_ROWS
        .with_label_values(&["inserted"])
        .inc_by(outcome.unique.len() as f64);
    metrics::IMPORT_ROWS
        .with_label_values(&["duplicate"])
        .inc_by(outcome.skipped as f64);

    info!(
        inserted = outcome.unique.len(),
        duplicates = outcome.skipped,
        rejected = rejected.len(),
        "Import batch processed"
    );

    ImportReport {
        inserted: outcome.unique,
        duplicates: outcome.skipped,
        rejected,
    }
}
