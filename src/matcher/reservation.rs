use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{OriginalId, RemakeId};

/// Original ids currently claimed by a match, with the claiming remake line.
///
/// The single source of truth for whether a legacy clip is still available.
#[derive(Debug, Clone, Default)]
pub struct ReservationSet {
    claimed: BTreeMap<OriginalId, RemakeId>,
}

impl ReservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self, original: &OriginalId) -> bool {
        !self.claimed.contains_key(original)
    }

    pub fn holder(&self, original: &OriginalId) -> Option<RemakeId> {
        self.claimed.get(original).copied()
    }

    /// Claims `original` for `remake`. Claiming an id that is already held
    /// is an error; callers check availability first.
    pub fn reserve(&mut self, original: &OriginalId, remake: RemakeId) -> Result<()> {
        if let Some(holder) = self.claimed.get(original) {
            return Err(Error::alignment(format!(
                "original {} is already reserved by remake {}",
                original, holder
            )));
        }
        self.claimed.insert(original.clone(), remake);
        Ok(())
    }

    pub fn release(&mut self, original: &OriginalId) -> Option<RemakeId> {
        self.claimed.remove(original)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OriginalId, &RemakeId)> {
        self.claimed.iter()
    }
}
