use log::{debug, info};

use crate::error::Result;
use crate::types::{MatchKind, RemakeUtterance};
use super::audit::{AuditEvent, Pass};
use super::index::CandidateIndex;
use super::state::AlignmentState;

/// Resolves pending lines whose text has several script candidates by
/// comparing the surrounding lines verbatim. The first available candidate
/// in script order whose previous and next lines both match wins.
pub fn run(remakes: &[RemakeUtterance], index: &CandidateIndex, state: &mut AlignmentState) -> Result<usize> {
    let mut resolved = 0;
    let mut deferred = 0;

    for remake in remakes {
        if !state.is_pending(remake.id) {
            continue;
        }
        let candidates = index.script_candidates(&remake.text);
        if candidates.len() < 2 {
            continue;
        }

        let hit = candidates.into_iter().find(|c| {
            state.reservations().is_available(&c.id)
                && c.context.prev == remake.context.prev
                && c.context.next == remake.context.next
        });
        match hit {
            Some(original) => {
                if state.try_commit(remake, original, MatchKind::ContextTriplet, Pass::ContextTriplet)? {
                    resolved += 1;
                }
            },
            None => {
                debug!("No context triplet for {} among ambiguous candidates", remake.id);
                state.note(remake.id, Pass::ContextTriplet, AuditEvent::Deferred {
                    reason: "no candidate with matching previous and next lines".to_string(),
                });
                deferred += 1;
            },
        }
    }

    info!("Context triplet pass: {} resolved, {} deferred", resolved, deferred);
    Ok(resolved)
}
