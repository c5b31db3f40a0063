//! Builders shared by the matcher unit tests.

use crate::corpus::context::{sort_and_annotate, ungrouped};
use crate::corpus::OriginalCorpus;
use crate::parser::classify::classify_stem;
use crate::types::{Context, OriginalId, OriginalUtterance, RemakeId, RemakeUtterance, ScenePosition};
use super::index::CandidateIndex;

pub fn voice(id: &str, text: &str) -> OriginalUtterance {
    OriginalUtterance {
        id: OriginalId::new(id),
        text: text.to_string(),
        character_id: None,
        script_id: None,
        source_file: None,
        scene: ScenePosition::from_voice_id(id),
        context: Context::default(),
    }
}

pub fn remake(id: RemakeId, text: &str) -> RemakeUtterance {
    let filename = format!("v001_00_{:04}", id);
    RemakeUtterance {
        id,
        text: text.to_string(),
        classification: classify_stem(&filename),
        filename,
        context: Context::default(),
    }
}

/// Remake lines with ids 1.. and global context.
pub fn remakes(texts: &[&str]) -> Vec<RemakeUtterance> {
    let mut lines: Vec<RemakeUtterance> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| remake(i as RemakeId + 1, text))
        .collect();
    sort_and_annotate(&mut lines, |a, b| a.id.cmp(&b.id), ungrouped::<RemakeUtterance>);
    lines
}

/// Index over voice lines given as `(voice_id, text)`, reused as the script.
pub fn index(voices: &[(&str, &str)]) -> CandidateIndex {
    let records = voices.iter().map(|(id, text)| voice(id, text)).collect();
    CandidateIndex::new(OriginalCorpus::from_records(records, None))
}
