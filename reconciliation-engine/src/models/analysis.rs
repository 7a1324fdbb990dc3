//! Analysis results: three derived entry-reference sets, recomputed on
//! demand and never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of one analyzer run over a (client, ledger type) batch.
///
/// Membership is deterministic in the input batch: recomputing against the
/// same entries yields identical sets in identical order. The sets are not
/// mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Invoices/bills whose counterparty has been invoiced more than paid.
    pub unsolved: Vec<Uuid>,
    /// Payment entries lacking an acceptable justification reference.
    pub missing_justification: Vec<Uuid>,
    /// Entries matching the suspicious-pattern heuristics.
    pub suspicious: Vec<Uuid>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.unsolved.is_empty()
            && self.missing_justification.is_empty()
            && self.suspicious.is_empty()
    }

    pub fn total_flagged(&self) -> usize {
        self.unsolved.len() + self.missing_justification.len() + self.suspicious.len()
    }
}

/// Single badge shown per entry. Display convention only: the underlying
/// sets may overlap, the badge picks the highest-priority one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyBadge {
    Unsolved,
    MissingJustification,
    Suspicious,
    Compliant,
}

impl AnomalyBadge {
    pub fn for_entry(entry_id: &Uuid, result: &AnalysisResult) -> Self {
        if result.unsolved.contains(entry_id) {
            Self::Unsolved
        } else if result.missing_justification.contains(entry_id) {
            Self::MissingJustification
        } else if result.suspicious.contains(entry_id) {
            Self::Suspicious
        } else {
            Self::Compliant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsolved => "unsolved",
            Self::MissingJustification => "missing_justification",
            Self::Suspicious => "suspicious",
            Self::Compliant => "compliant",
        }
    }
}
