// src/output/analysis.rs

use std::collections::BTreeMap;
use ahash::AHashMap;
use log::debug;
use serde::{Serialize, Deserialize};

use crate::matcher::CandidateIndex;
use crate::types::{OriginalId, RemakeId};
use super::{AlignmentReport, MatchedEntry};

/// Remake character id paired with the legacy character id its lines map to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMapping {
    pub remake_character_id: String,
    pub original_character_id: String,
}

/// Legacy character id as carried by the clip name: the three digits after `ch`.
fn original_character(entry: &MatchedEntry) -> Option<String> {
    entry.clip_name().get(2..5).map(str::to_string)
}

/// Most common legacy character per remake character, ties going to the
/// smallest id. Sorted by remake character id.
pub fn character_mapping(matched: &[MatchedEntry]) -> Vec<CharacterMapping> {
    let mut counts: BTreeMap<String, AHashMap<String, usize>> = BTreeMap::new();
    for entry in matched {
        let remake_character = match entry.classification.character_id.as_ref() {
            Some(id) => id,
            None => continue,
        };
        let original = match original_character(entry) {
            Some(id) => id,
            None => continue,
        };
        *counts
            .entry(remake_character.clone())
            .or_default()
            .entry(original)
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(remake_character_id, originals)| {
            let (original_character_id, _) = originals
                .into_iter()
                .max_by(|(a_id, a_count), (b_id, b_count)| a_count.cmp(b_count).then_with(|| b_id.cmp(a_id)))?;
            Some(CharacterMapping { remake_character_id, original_character_id })
        })
        .collect()
}

/// One side of a reviewed triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextComparison {
    pub context: String,
    pub remake_id: RemakeId,
    pub remake_text: String,
    pub original_id: Option<OriginalId>,
    pub original_text: String,
}

/// An unmatched line sitting between two matches whose legacy ids leave
/// exactly one slot free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextReportEntry {
    pub unmatched_remake_id: RemakeId,
    pub inferred_original_id: OriginalId,
    pub comparison: Vec<ContextComparison>,
}

pub fn context_report(report: &AlignmentReport, index: &CandidateIndex) -> Vec<ContextReportEntry> {
    let matched: AHashMap<RemakeId, &MatchedEntry> =
        report.matched.iter().map(|m| (m.remake_id, m)).collect();

    let mut entries = Vec::new();
    for line in &report.unmatched {
        let id = line.remake_id;
        let (prev, next) = match (
            id.checked_sub(1).and_then(|p| matched.get(&p)),
            id.checked_add(1).and_then(|n| matched.get(&n)),
        ) {
            (Some(prev), Some(next)) => (*prev, *next),
            _ => continue,
        };
        let (prev_numeric, next_numeric) = match (prev.original_id.numeric(), next.original_id.numeric()) {
            (Some(p), Some(n)) => (p, n),
            _ => continue,
        };
        if prev_numeric.checked_add(2) != Some(next_numeric) {
            continue;
        }
        let inferred = match index
            .position_by_numeric(prev_numeric + 1)
            .and_then(|position| index.voice_at(position))
        {
            Some(voice) => voice,
            None => {
                debug!("Remake {}: no legacy line with numeric id {}", id, prev_numeric + 1);
                continue;
            }
        };

        entries.push(ContextReportEntry {
            unmatched_remake_id: id,
            inferred_original_id: inferred.id.clone(),
            comparison: vec![
                ContextComparison {
                    context: "previous".to_string(),
                    remake_id: prev.remake_id,
                    remake_text: prev.remake_text.clone(),
                    original_id: Some(prev.original_id.clone()),
                    original_text: prev.original_text.clone(),
                },
                ContextComparison {
                    context: "current_unmatched".to_string(),
                    remake_id: id,
                    remake_text: line.text.clone(),
                    original_id: Some(inferred.id.clone()),
                    original_text: inferred.text.clone(),
                },
                ContextComparison {
                    context: "next".to_string(),
                    remake_id: next.remake_id,
                    remake_text: next.remake_text.clone(),
                    original_id: Some(next.original_id.clone()),
                    original_text: next.original_text.clone(),
                },
            ],
        });
    }

    entries.sort_by_key(|e| e.unmatched_remake_id);
    debug!("Context report: {} candidate lines", entries.len());
    entries
}
