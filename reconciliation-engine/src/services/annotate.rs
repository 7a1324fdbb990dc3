//! Display annotation: attaches `AiMeta` to analyzed entries using the
//! text-generation collaborator. Decorative only; provider failures leave
//! entries unannotated rather than failing the caller.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::models::{AiMeta, AnalysisResult, LedgerEntry, LedgerType, SuspiciousLevel};
use crate::services::analyzer::suspicious_reasons;
use crate::services::providers::{JustificationContext, TextGenerator};

pub struct AnnotationService {
    generator: Arc<dyn TextGenerator>,
}

impl AnnotationService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Annotate the flagged entries of a batch in place. Returns the
    /// number of entries that received an annotation.
    #[instrument(skip(self, entries, result), fields(ledger_type = %ledger_type))]
    pub async fn annotate(
        &self,
        ledger_type: LedgerType,
        entries: &mut [LedgerEntry],
        result: &AnalysisResult,
    ) -> usize {
        let mut annotated = 0;

        let suspicious: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| result.suspicious.contains(&e.entry_id))
            .cloned()
            .collect();
        let suggestions = if suspicious.is_empty() {
            Vec::new()
        } else {
            match self.generator.generate_suggestions(&suspicious).await {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    warn!(error = %e, "Suggestion generation unavailable");
                    Vec::new()
                }
            }
        };

        for entry in entries.iter_mut() {
            let mut reasons = Vec::new();
            let mut entry_suggestions = Vec::new();
            let mut level = None;

            if let Some(position) = suspicious
                .iter()
                .position(|s| s.entry_id == entry.entry_id)
            {
                reasons.extend(suspicious_reasons(ledger_type, entry));
                if let Some(suggestion) = suggestions.get(position) {
                    entry_suggestions.push(suggestion.clone());
                }
                level = Some(if entry.amount() > Decimal::from(10_000) {
                    SuspiciousLevel::High
                } else {
                    SuspiciousLevel::Medium
                });
            }

            if result.missing_justification.contains(&entry.entry_id) {
                reasons.push("missing justification reference".to_string());
                let context = JustificationContext::sanitized(entry);
                match self.generator.generate_justification(&context).await {
                    Ok(draft) => entry_suggestions.push(draft),
                    Err(e) => warn!(error = %e, "Justification draft unavailable"),
                }
                level.get_or_insert(SuspiciousLevel::Low);
            }

            if let Some(level) = level {
                entry.ai_meta = Some(AiMeta {
                    suspicious_level: level,
                    reasons,
                    suggestions: entry_suggestions,
                });
                annotated += 1;
            }
        }

        annotated
    }
}
