// src/matcher/blockwise.rs

use std::collections::BTreeMap;
use ahash::AHashSet;
use log::{debug, info, log_enabled, Level};

use crate::error::Result;
use crate::types::{MatchKind, RemakeUtterance};
use super::audit::{AuditEvent, Pass};
use super::index::CandidateIndex;
use super::state::AlignmentState;

/// A remake position resolved to a voice position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub voice: usize,
    pub kind: MatchKind,
}

/// Why a line inside a gap could not be filled.
#[derive(Debug, Clone, PartialEq)]
pub struct GapNote {
    pub position: usize,
    pub reason: String,
}

/// Result of the blockwise planning over the sorted remake sequence:
/// `mapping[i]` is the anchor for remake position `i`, if any.
#[derive(Debug, Clone, Default)]
pub struct BlockwisePlan {
    pub mapping: Vec<Option<Anchor>>,
    pub notes: Vec<GapNote>,
    pub conflicts: usize,
}

impl BlockwisePlan {
    pub fn resolved(&self) -> usize {
        self.mapping.iter().filter(|a| a.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
    Voice(usize),
    Conflict,
}

fn cast(votes: &mut BTreeMap<usize, Vote>, position: usize, voice: usize) {
    votes
        .entry(position)
        .and_modify(|vote| {
            if *vote != Vote::Voice(voice) {
                *vote = Vote::Conflict;
            }
        })
        .or_insert(Vote::Voice(voice));
}

/// Step 1: every remake line whose (prev, text, next) window is found exactly
/// once in the voice corpus votes for that line and, where the windows
/// overlap, for its two neighbours. A position with disagreeing votes stays
/// unresolved. The mapping is kept one-to-one, lower positions first.
fn triplet_votes(remakes: &[RemakeUtterance], index: &CandidateIndex) -> (Vec<Option<Anchor>>, usize) {
    let mut votes: BTreeMap<usize, Vote> = BTreeMap::new();

    for (i, remake) in remakes.iter().enumerate() {
        let positions = index.triplet_positions(&remake.context.prev, &remake.text, &remake.context.next);
        let voice = match positions {
            [only] => *only,
            _ => continue,
        };
        cast(&mut votes, i, voice);

        // Neighbour votes need the remake neighbour to be the context line
        // and the voice neighbour to sit in the same scene.
        if i > 0 && voice > 0 && !remake.context.prev.is_empty() && remakes[i - 1].text == remake.context.prev {
            cast(&mut votes, i - 1, voice - 1);
        }
        if i + 1 < remakes.len() && !remake.context.next.is_empty() && remakes[i + 1].text == remake.context.next {
            cast(&mut votes, i + 1, voice + 1);
        }
    }

    let mut mapping = vec![None; remakes.len()];
    let mut claimed: AHashSet<usize> = AHashSet::new();
    let mut conflicts = 0;
    for (position, vote) in votes {
        match vote {
            Vote::Voice(voice) if claimed.insert(voice) => {
                mapping[position] = Some(Anchor { voice, kind: MatchKind::ContextTriplet });
            },
            Vote::Voice(voice) => {
                debug!("Blockwise: voice {} already anchored, position {} left open", voice, position);
                conflicts += 1;
            },
            Vote::Conflict => {
                debug!("Blockwise: conflicting triplet votes at position {}", position);
                conflicts += 1;
            },
        }
    }
    (mapping, conflicts)
}

/// Fills runs of unresolved positions bounded by anchors on both sides.
///
/// `key_of` gives the sequential key of an anchored voice, `lookup` maps a key
/// back to a voice. A run of length `g` between keys `kb` and `ka` is filled
/// only when `ka - kb - 1 == g`, position `start + k` taking key `kb + 1 + k`.
/// A predicted key that is missing or already anchored leaves that line open
/// and adds a note. Returns the number of filled positions.
pub fn interpolate_gaps<K, L>(
    mapping: &mut [Option<Anchor>],
    key_of: K,
    lookup: L,
    notes: &mut Vec<GapNote>,
) -> usize
where
    K: Fn(usize) -> Option<u64>,
    L: Fn(u64) -> Option<usize>,
{
    let mut claimed: AHashSet<usize> = mapping.iter().flatten().map(|a| a.voice).collect();
    let mut filled = 0;
    let mut i = 0;

    while i < mapping.len() {
        if mapping[i].is_some() {
            i += 1;
            continue;
        }
        // Maximal run of None starting at i
        let start = i;
        while i < mapping.len() && mapping[i].is_none() {
            i += 1;
        }
        let end = i;
        if start == 0 || end == mapping.len() {
            continue;
        }

        let (before, after) = match (mapping[start - 1], mapping[end]) {
            (Some(b), Some(a)) => (b, a),
            _ => continue,
        };
        let (kb, ka) = match (key_of(before.voice), key_of(after.voice)) {
            (Some(kb), Some(ka)) if ka > kb => (kb, ka),
            _ => continue,
        };
        let gap = (end - start) as u64;
        if ka - kb - 1 != gap {
            debug!(
                "Margin {}..{}: remake gap {} vs original gap {}, not interpolated",
                start,
                end,
                gap,
                ka - kb - 1
            );
            continue;
        }

        for k in 0..gap {
            let position = start + k as usize;
            let key = kb + 1 + k;
            match lookup(key) {
                Some(voice) if claimed.insert(voice) => {
                    mapping[position] = Some(Anchor { voice, kind: MatchKind::AnchorInterpolated });
                    filled += 1;
                },
                Some(voice) => notes.push(GapNote {
                    position,
                    reason: format!("predicted voice {} is already anchored", voice),
                }),
                None => notes.push(GapNote {
                    position,
                    reason: format!("predicted key {} is not in the original corpus", key),
                }),
            }
        }
    }
    filled
}

/// Steps 1-4 without touching any state.
pub fn plan(remakes: &[RemakeUtterance], index: &CandidateIndex) -> BlockwisePlan {
    let (mut mapping, conflicts) = triplet_votes(remakes, index);
    let mut notes = Vec::new();

    // Script order: the numeric value of the voice id
    let by_id = interpolate_gaps(
        &mut mapping,
        |voice| index.voice_at(voice).and_then(|o| o.id.numeric()),
        |key| index.position_by_numeric(key),
        &mut notes,
    );
    // Scene order: dense position in the sorted voice list
    let voice_count = index.voices().len();
    let by_scene = interpolate_gaps(
        &mut mapping,
        |voice| Some(voice as u64),
        |key| {
            let voice = key as usize;
            if voice < voice_count { Some(voice) } else { None }
        },
        &mut notes,
    );

    if log_enabled!(Level::Debug) {
        debug!(
            "Blockwise plan: {} interpolated by id, {} by scene order, {} notes",
            by_id,
            by_scene,
            notes.len()
        );
    }
    BlockwisePlan { mapping, notes, conflicts }
}

/// Plans over the sorted remake sequence and commits every anchor in id
/// order. Lines left open stay pending for the later passes.
pub fn run(remakes: &[RemakeUtterance], index: &CandidateIndex, state: &mut AlignmentState) -> Result<usize> {
    let plan = plan(remakes, index);

    for note in &plan.notes {
        state.note(remakes[note.position].id, Pass::Blockwise, AuditEvent::Rejected {
            original_id: None,
            reason: note.reason.clone(),
        });
    }

    let mut committed = 0;
    for (remake, anchor) in remakes.iter().zip(&plan.mapping) {
        let anchor = match anchor {
            Some(anchor) if state.is_pending(remake.id) => anchor,
            _ => continue,
        };
        if let Some(original) = index.voice_at(anchor.voice) {
            if state.try_commit(remake, original, anchor.kind, Pass::Blockwise)? {
                committed += 1;
            }
        }
    }

    info!(
        "Blockwise pass: {} matches ({} from triplets), {} conflicts, {} unfilled gap lines",
        committed,
        plan.mapping
            .iter()
            .flatten()
            .filter(|a| a.kind == MatchKind::ContextTriplet)
            .count(),
        plan.conflicts,
        plan.notes.len()
    );
    Ok(committed)
}
