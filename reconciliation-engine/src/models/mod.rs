//! Domain models for the reconciliation engine.

#![allow(clippy::should_implement_trait)]

pub mod analysis;
pub mod balance;
pub mod comment;
pub mod entry;

pub use analysis::{AnalysisResult, AnomalyBadge};
pub use balance::{AccountBalance, BalanceSnapshot};
pub use comment::{AuthorType, CommentPriority, LedgerComment, NewComment};
pub use entry::{AiMeta, LedgerEntry, LedgerKind, LedgerType, SuspiciousLevel};
