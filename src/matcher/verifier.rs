// src/matcher/verifier.rs

use ahash::AHashSet;
use log::{debug, info};

use crate::error::Result;
use crate::types::{RemakeId, RemakeUtterance, ScenePosition};
use super::audit::{AuditEvent, Pass};
use super::index::CandidateIndex;
use super::state::AlignmentState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyStats {
    pub checked: usize,
    pub confirmed: usize,
    pub kept: usize,
    pub reverted: usize,
}

/// What a neighbouring remake line looks like from the line being checked.
enum Neighbour {
    /// No in-scope remake line with the adjacent id.
    Absent,
    Unmatched,
    Matched(Option<ScenePosition>),
}

fn neighbour(
    id: Option<RemakeId>,
    in_scope: &AHashSet<RemakeId>,
    index: &CandidateIndex,
    state: &AlignmentState,
) -> Neighbour {
    // Lines filtered out of the aligned set count as absent, not as unmatched
    let id = match id {
        Some(id) if in_scope.contains(&id) => id,
        _ => return Neighbour::Absent,
    };
    match state.match_for(id) {
        Some(record) => Neighbour::Matched(index.get(&record.original_id).and_then(|o| o.scene.clone())),
        None => Neighbour::Unmatched,
    }
}

/// A neighbour is consistent when it is absent, or matched into another
/// scene, or matched to the expected sequence number.
fn side_ok(side: &Neighbour, scene: &ScenePosition, expected_seq: i64) -> bool {
    match side {
        Neighbour::Absent => true,
        Neighbour::Unmatched => false,
        Neighbour::Matched(None) => true,
        Neighbour::Matched(Some(other)) => {
            other.scene_id != scene.scene_id || other.seq as i64 == expected_seq
        },
    }
}

/// Checks the line against its remake neighbours (ids one below and one
/// above). Returns the reason when the local ordering is inconsistent.
fn inconsistency(
    scene: &ScenePosition,
    prev: &Neighbour,
    next: &Neighbour,
) -> Option<String> {
    let seq = scene.seq as i64;
    if !side_ok(prev, scene, seq - 1) {
        return Some(format!("previous line does not map to {}:{}", scene.scene_id, seq - 1));
    }
    if !side_ok(next, scene, seq + 1) {
        return Some(format!("next line does not map to {}:{}", scene.scene_id, seq + 1));
    }
    if let (Neighbour::Matched(Some(p)), Neighbour::Matched(Some(n))) = (prev, next) {
        if p.scene_id == n.scene_id && !(p.seq <= scene.seq && scene.seq <= n.seq) {
            return Some(format!(
                "sequence {} outside its neighbours {}..{}",
                scene.seq, p.seq, n.seq
            ));
        }
    }
    None
}

/// Re-checks every exact and normalized match in ascending remake id.
///
/// Neighbours are read from the live state, so a line reverted earlier in
/// the loop already counts as unmatched for the lines after it. An
/// inconsistent match is reverted unless its text had a single candidate.
pub fn run(remakes: &[RemakeUtterance], index: &CandidateIndex, state: &mut AlignmentState) -> Result<VerifyStats> {
    let in_scope: AHashSet<RemakeId> = remakes.iter().map(|r| r.id).collect();
    let mut stats = VerifyStats::default();

    for remake in remakes {
        let record = match state.match_for(remake.id) {
            Some(record) if record.kind.is_textual() => record.clone(),
            _ => continue,
        };
        stats.checked += 1;

        let scene = match index.get(&record.original_id).and_then(|o| o.scene.clone()) {
            Some(scene) => scene,
            None => {
                stats.confirmed += 1;
                continue;
            },
        };

        let prev = neighbour(remake.id.checked_sub(1), &in_scope, index, state);
        let next = neighbour(remake.id.checked_add(1), &in_scope, index, state);
        let reason = match inconsistency(&scene, &prev, &next) {
            Some(reason) => reason,
            None => {
                stats.confirmed += 1;
                continue;
            },
        };

        if index.candidate_count(&remake.text) == 1 {
            debug!("Keeping {} -> {} (single candidate): {}", remake.id, record.original_id, reason);
            state.note(remake.id, Pass::Verifier, AuditEvent::Kept {
                original_id: record.original_id.clone(),
                reason,
            });
            stats.kept += 1;
        } else {
            state.revert(remake.id, Pass::Verifier, reason)?;
            stats.reverted += 1;
        }
    }

    info!(
        "Context verification: {} checked, {} confirmed, {} kept as unique, {} reverted",
        stats.checked, stats.confirmed, stats.kept, stats.reverted
    );
    Ok(stats)
}
