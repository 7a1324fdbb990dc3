//! Comment threads attached to ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::LedgerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorType {
    Collaborator,
    Client,
    System,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collaborator => "collaborator",
            Self::Client => "client",
            Self::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "collaborator" => Self::Collaborator,
            "client" => Self::Client,
            _ => Self::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPriority {
    Low,
    Normal,
    High,
}

impl CommentPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Normal,
        }
    }
}

/// Stored comment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerComment {
    pub id: Uuid,
    pub entry_id: String,
    pub client_id: String,
    pub ledger_type: String,
    pub author: String,
    pub author_type: String,
    pub content: String,
    pub priority: String,
    pub is_internal: bool,
    pub created_utc: DateTime<Utc>,
}

impl LedgerComment {
    pub fn parsed_author_type(&self) -> AuthorType {
        AuthorType::from_str(&self.author_type)
    }

    pub fn parsed_priority(&self) -> CommentPriority {
        CommentPriority::from_str(&self.priority)
    }
}

/// Input for posting a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub entry_id: String,
    pub client_id: String,
    pub ledger_type: LedgerType,
    pub author: String,
    pub author_type: AuthorType,
    pub content: String,
    pub priority: CommentPriority,
    pub is_internal: bool,
}
