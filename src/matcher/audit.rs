use serde::{Serialize, Deserialize};
use std::fmt;

use crate::types::{MatchKind, OriginalId, RemakeId};

/// The pass that produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Blockwise,
    Exact,
    Verifier,
    ContextTriplet,
    Semantic,
    Finalize,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pass::Blockwise => "blockwise",
            Pass::Exact => "exact",
            Pass::Verifier => "verifier",
            Pass::ContextTriplet => "context_triplet",
            Pass::Semantic => "semantic",
            Pass::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Matched { original_id: OriginalId, kind: MatchKind },
    /// A match the verifier found out of order and released.
    Reverted { original_id: OriginalId, reason: String },
    /// Out of order, but the text had a single candidate.
    Kept { original_id: OriginalId, reason: String },
    /// A candidate was considered and turned down.
    Rejected { original_id: Option<OriginalId>, reason: String },
    /// The pass could not decide; the line moves on to later passes.
    Deferred { reason: String },
    Unmatched { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub remake_id: RemakeId,
    pub pass: Pass,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Append-only record of every decision, in the order it was made.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, remake_id: RemakeId, pass: Pass, event: AuditEvent) {
        self.entries.push(AuditEntry { remake_id, pass, event });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn for_remake(&self, remake_id: RemakeId) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.remake_id == remake_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
