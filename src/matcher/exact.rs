use log::info;

use crate::config::subsystems::MatcherConfig;
use crate::error::Result;
use crate::types::{MatchKind, RemakeUtterance};
use super::audit::Pass;
use super::index::CandidateIndex;
use super::state::AlignmentState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactStats {
    pub exact: usize,
    pub normalized: usize,
}

/// Matches pending lines whose text equals an available original line,
/// falling back to the punctuation-insensitive key. `remakes` must be sorted
/// by id; the first free candidate in id order wins.
pub fn run(
    remakes: &[RemakeUtterance],
    index: &CandidateIndex,
    state: &mut AlignmentState,
    config: &MatcherConfig,
) -> Result<ExactStats> {
    let mut stats = ExactStats::default();

    for remake in remakes {
        if !state.is_pending(remake.id) {
            continue;
        }

        if config.use_exact {
            let free = index
                .exact_candidates(&remake.text)
                .into_iter()
                .find(|o| state.reservations().is_available(&o.id));
            if let Some(original) = free {
                if state.try_commit(remake, original, MatchKind::Exact, Pass::Exact)? {
                    stats.exact += 1;
                    continue;
                }
            }
        }

        if config.use_normalized {
            let free = index
                .normalized_candidates(&remake.text)
                .into_iter()
                .find(|o| state.reservations().is_available(&o.id));
            if let Some(original) = free {
                if state.try_commit(remake, original, MatchKind::Normalized, Pass::Exact)? {
                    stats.normalized += 1;
                }
            }
        }
    }

    info!(
        "Exact pass: {} exact, {} normalized matches",
        stats.exact, stats.normalized
    );
    Ok(stats)
}
