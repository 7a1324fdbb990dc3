//! Content-based identity signatures used to detect duplicate entries
//! across repeated imports.

use std::collections::HashSet;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::models::{LedgerEntry, LedgerKind};

/// Lowercase, fold accents and collapse whitespace so that casing and
/// encoding variants of the same text collapse to one projection.
pub fn canonical_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match fold_accent(c) {
            Some(folded) => out.push_str(folded),
            None => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Accent folding for the Latin-1 range the import formats produce.
fn fold_accent(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' | 'À' | 'Â' | 'Ä' | 'Á' | 'Ã' => "a",
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => "e",
        'î' | 'ï' | 'í' | 'ì' | 'Î' | 'Ï' | 'Í' | 'Ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' | 'Ô' | 'Ö' | 'Ó' | 'Ò' | 'Õ' => "o",
        'û' | 'ü' | 'ù' | 'ú' | 'Û' | 'Ü' | 'Ù' | 'Ú' => "u",
        'ç' | 'Ç' => "c",
        'ñ' | 'Ñ' => "n",
        'ÿ' | 'ý' | 'Ý' => "y",
        'œ' | 'Œ' => "oe",
        'æ' | 'Æ' => "ae",
        _ => return None,
    })
}

/// Two-decimal rendering so equal amounts hash identically regardless of
/// the scale they were parsed with.
fn canonical_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn kind_projection(kind: &LedgerKind) -> String {
    let tag = kind.ledger_type().as_str();
    match kind.discriminant() {
        Some(value) => format!("{}:{}", tag, canonical_text(value)),
        None => tag.to_string(),
    }
}

/// Deterministic content signature of an entry.
///
/// Two semantically identical entries collapse to the same signature even
/// when produced by different import files, casings or accent encodings.
pub fn signature_of(entry: &LedgerEntry) -> String {
    let projection = [
        canonical_text(&entry.client_id),
        kind_projection(&entry.kind),
        entry.date.map(|d| d.to_string()).unwrap_or_default(),
        canonical_text(&entry.account_number),
        canonical_text(&entry.description),
        canonical_text(&entry.reference),
        canonical_amount(entry.debit),
        canonical_amount(entry.credit),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(projection.as_bytes());
    hex::encode(hasher.finalize())
}

/// Surviving entries plus the number of duplicates skipped.
#[derive(Debug)]
pub struct DedupOutcome {
    pub unique: Vec<LedgerEntry>,
    pub skipped: usize,
}

/// Filter a candidate batch against previously seen signatures.
///
/// Keeps first-seen order; an entry is excluded when its signature is
/// already in `existing` or appeared earlier in the same batch. The caller
/// owns the signature set, which is updated in place.
pub fn dedup(entries: Vec<LedgerEntry>, existing: &mut HashSet<String>) -> DedupOutcome {
    let mut unique = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for entry in entries {
        let signature = signature_of(&entry);
        if existing.insert(signature) {
            unique.push(entry);
        } else {
            skipped += 1;
        }
    }

    DedupOutcome { unique, skipped }
}
