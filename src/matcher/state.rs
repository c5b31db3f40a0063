use std::collections::BTreeMap;
use log::debug;

use crate::error::{Error, Result};
use crate::types::{MatchKind, MatchRecord, OriginalUtterance, RemakeId, RemakeUtterance};
use super::audit::{AuditEvent, AuditLog, Pass};
use super::reservation::ReservationSet;

/// Where a single remake line stands.
///
/// `Unprocessed -> Matched -> Reverted -> Matched` through the verifier, and
/// every line ends in `Matched` or `Unmatched` once all passes have run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineState {
    Unprocessed,
    Matched(MatchKind),
    Reverted,
    Unmatched,
}

impl LineState {
    /// Still waiting for a pass to match it.
    pub fn is_pending(&self) -> bool {
        matches!(self, LineState::Unprocessed | LineState::Reverted)
    }
}

/// Everything the passes share: line states, live matches, reservations and
/// the audit trail. Owned by the pipeline and handed to each pass in turn.
#[derive(Debug, Clone, Default)]
pub struct AlignmentState {
    states: BTreeMap<RemakeId, LineState>,
    matches: BTreeMap<RemakeId, MatchRecord>,
    reservations: ReservationSet,
    audit: AuditLog,
}

impl AlignmentState {
    pub fn new<'a, I>(remake_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a RemakeId>,
    {
        Self {
            states: remake_ids
                .into_iter()
                .map(|id| (*id, LineState::Unprocessed))
                .collect(),
            ..Self::default()
        }
    }

    pub fn state(&self, remake_id: RemakeId) -> Option<LineState> {
        self.states.get(&remake_id).copied()
    }

    pub fn is_pending(&self, remake_id: RemakeId) -> bool {
        self.state(remake_id).map(|s| s.is_pending()).unwrap_or(false)
    }

    /// Pending ids in ascending order.
    pub fn pending_ids(&self) -> Vec<RemakeId> {
        self.states
            .iter()
            .filter(|(_, s)| s.is_pending())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn match_for(&self, remake_id: RemakeId) -> Option<&MatchRecord> {
        self.matches.get(&remake_id)
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchRecord> {
        self.matches.values()
    }

    pub fn reservations(&self) -> &ReservationSet {
        &self.reservations
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn note(&mut self, remake_id: RemakeId, pass: Pass, event: AuditEvent) {
        self.audit.record(remake_id, pass, event);
    }

    /// Matches `remake` to `original` if the original is still free.
    ///
    /// Returns `Ok(false)` when another line already holds the original: the
    /// first writer wins. Committing a line that is not pending is an error,
    /// existing matches are never overwritten.
    pub fn try_commit(
        &mut self,
        remake: &RemakeUtterance,
        original: &OriginalUtterance,
        kind: MatchKind,
        pass: Pass,
    ) -> Result<bool> {
        if !self.is_pending(remake.id) {
            return Err(Error::alignment(format!(
                "remake {} is not pending (state {:?})",
                remake.id,
                self.state(remake.id)
            )));
        }
        if let Some(holder) = self.reservations.holder(&original.id) {
            self.audit.record(remake.id, pass, AuditEvent::Rejected {
                original_id: Some(original.id.clone()),
                reason: format!("already reserved by remake {}", holder),
            });
            return Ok(false);
        }

        self.reservations.reserve(&original.id, remake.id)?;
        self.matches.insert(remake.id, MatchRecord {
            remake_id: remake.id,
            original_id: original.id.clone(),
            kind,
            remake_text: remake.text.clone(),
            original_text: original.text.clone(),
        });
        self.states.insert(remake.id, LineState::Matched(kind));
        self.audit.record(remake.id, pass, AuditEvent::Matched {
            original_id: original.id.clone(),
            kind,
        });
        debug!("[{}] {} -> {} ({})", pass, remake.id, original.id, kind.label());
        Ok(true)
    }

    /// Drops the match for `remake_id`, releases its reservation and puts the
    /// line back in the pending pool.
    pub fn revert(&mut self, remake_id: RemakeId, pass: Pass, reason: String) -> Result<MatchRecord> {
        let record = self.matches.remove(&remake_id).ok_or_else(|| {
            Error::alignment(format!("remake {} has no match to revert", remake_id))
        })?;
        self.reservations.release(&record.original_id);
        self.states.insert(remake_id, LineState::Reverted);
        debug!("[{}] reverted {} -> {}: {}", pass, remake_id, record.original_id, reason);
        self.audit.record(remake_id, pass, AuditEvent::Reverted {
            original_id: record.original_id.clone(),
            reason,
        });
        Ok(record)
    }

    /// Terminal failure for a pending line.
    pub fn mark_unmatched(&mut self, remake_id: RemakeId, pass: Pass, reason: String) -> Result<()> {
        if !self.is_pending(remake_id) {
            return Err(Error::alignment(format!(
                "remake {} cannot become unmatched from {:?}",
                remake_id,
                self.state(remake_id)
            )));
        }
        self.states.insert(remake_id, LineState::Unmatched);
        self.audit.record(remake_id, pass, AuditEvent::Unmatched { reason });
        Ok(())
    }

    /// Every line matched or unmatched, every match backed by exactly one
    /// reservation.
    pub fn check_invariants(&self) -> Result<()> {
        for (id, state) in &self.states {
            match state {
                LineState::Matched(_) => {
                    let record = self.matches.get(id).ok_or_else(|| {
                        Error::alignment(format!("remake {} is matched without a record", id))
                    })?;
                    if self.reservations.holder(&record.original_id) != Some(*id) {
                        return Err(Error::alignment(format!(
                            "remake {} holds {} without its reservation",
                            id, record.original_id
                        )));
                    }
                },
                LineState::Unmatched => {
                    if self.matches.contains_key(id) {
                        return Err(Error::alignment(format!(
                            "remake {} is unmatched but has a record",
                            id
                        )));
                    }
                },
                pending => {
                    return Err(Error::alignment(format!(
                        "remake {} left in state {:?}",
                        id, pending
                    )));
                },
            }
        }
        if self.reservations.len() != self.matches.len() {
            return Err(Error::alignment(format!(
                "{} reservations for {} matches",
                self.reservations.len(),
                self.matches.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<RemakeId, LineState>, BTreeMap<RemakeId, MatchRecord>, AuditLog) {
        (self.states, self.matches, self.audit)
    }
}
