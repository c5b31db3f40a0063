use std::collections::BTreeMap;
use ahash::AHashMap;
use log::{info, trace};

use crate::corpus::OriginalCorpus;
use crate::parser::normalize;
use crate::types::{OriginalId, OriginalUtterance};

/// Joins the three parts of a context triplet. The unit separator never
/// appears in dialogue text.
const TRIPLET_SEPARATOR: char = '\u{1F}';

pub fn triplet_key(prev: &str, text: &str, next: &str) -> String {
    let mut key = String::with_capacity(prev.len() + text.len() + next.len() + 2);
    key.push_str(prev);
    key.push(TRIPLET_SEPARATOR);
    key.push_str(text);
    key.push(TRIPLET_SEPARATOR);
    key.push_str(next);
    key
}

/// Read-only lookups over the legacy corpus, built once per run.
///
/// Voice positions (indices into `corpus.voices`) double as the dense
/// scene-order numbering used by the blockwise matcher. Text keyed candidate
/// lists are sorted by original id, which is the tie-break for exact and
/// normalized matching.
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    corpus: OriginalCorpus,
    exact: AHashMap<String, Vec<usize>>,
    normalized: AHashMap<String, Vec<usize>>,
    triplet: AHashMap<String, Vec<usize>>,
    by_id: AHashMap<OriginalId, usize>,
    by_numeric: BTreeMap<u64, usize>,
    /// Text -> positions in `corpus.script`, in script order.
    script_exact: AHashMap<String, Vec<usize>>,
}

impl CandidateIndex {
    pub fn new(corpus: OriginalCorpus) -> Self {
        let mut exact: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut normalized: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut triplet: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut by_id = AHashMap::with_capacity(corpus.voices.len());
        let mut by_numeric = BTreeMap::new();

        for (pos, voice) in corpus.voices.iter().enumerate() {
            exact.entry(voice.text.clone()).or_default().push(pos);
            let key = normalize(&voice.text);
            if !key.is_empty() {
                normalized.entry(key).or_default().push(pos);
            }
            triplet
                .entry(triplet_key(&voice.context.prev, &voice.text, &voice.context.next))
                .or_default()
                .push(pos);
            by_id.insert(voice.id.clone(), pos);
            if let Some(n) = voice.id.numeric() {
                // Ids sharing a numeric prefix keep the first in scene order
                by_numeric.entry(n).or_insert(pos);
            }
        }

        let voices = &corpus.voices;
        for list in exact.values_mut().chain(normalized.values_mut()) {
            list.sort_by(|a, b| voices[*a].id.cmp(&voices[*b].id));
        }

        let mut script_exact: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (pos, line) in corpus.script.iter().enumerate() {
            script_exact.entry(line.text.clone()).or_default().push(pos);
        }

        trace!(
            "Index keys: {} exact, {} normalized, {} triplets, {} script texts",
            exact.len(),
            normalized.len(),
            triplet.len(),
            script_exact.len()
        );
        info!(
            "Candidate index built over {} voice lines and {} script lines",
            corpus.voices.len(),
            corpus.script.len()
        );

        Self {
            corpus,
            exact,
            normalized,
            triplet,
            by_id,
            by_numeric,
            script_exact,
        }
    }

    pub fn corpus(&self) -> &OriginalCorpus {
        &self.corpus
    }

    pub fn voices(&self) -> &[OriginalUtterance] {
        &self.corpus.voices
    }

    pub fn script(&self) -> &[OriginalUtterance] {
        &self.corpus.script
    }

    pub fn voice_at(&self, position: usize) -> Option<&OriginalUtterance> {
        self.corpus.voices.get(position)
    }

    pub fn get(&self, id: &OriginalId) -> Option<&OriginalUtterance> {
        self.position(id).map(|pos| &self.corpus.voices[pos])
    }

    /// Scene-order position of a voice line.
    pub fn position(&self, id: &OriginalId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Voice position whose id starts with the digits of `numeric`.
    pub fn position_by_numeric(&self, numeric: u64) -> Option<usize> {
        self.by_numeric.get(&numeric).copied()
    }

    pub fn exact_candidates(&self, text: &str) -> Vec<&OriginalUtterance> {
        self.resolve(self.exact.get(text))
    }

    /// Empty normalized text is never a key.
    pub fn normalized_candidates(&self, text: &str) -> Vec<&OriginalUtterance> {
        let key = normalize(text);
        if key.is_empty() {
            return Vec::new();
        }
        self.resolve(self.normalized.get(&key))
    }

    /// Number of exact candidates, or of normalized ones when there is no
    /// exact hit.
    pub fn candidate_count(&self, text: &str) -> usize {
        match self.exact.get(text).map(Vec::len) {
            Some(n) if n > 0 => n,
            _ => {
                let key = normalize(text);
                if key.is_empty() {
                    0
                } else {
                    self.normalized.get(&key).map(Vec::len).unwrap_or(0)
                }
            },
        }
    }

    /// Voice positions whose scene-scoped context triplet is identical.
    pub fn triplet_positions(&self, prev: &str, text: &str, next: &str) -> &[usize] {
        self.triplet
            .get(&triplet_key(prev, text, next))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Script lines with identical text, in script order.
    pub fn script_candidates(&self, text: &str) -> Vec<&OriginalUtterance> {
        self.script_exact
            .get(text)
            .map(|list| list.iter().map(|pos| &self.corpus.script[*pos]).collect())
            .unwrap_or_default()
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&OriginalUtterance> {
        positions
            .map(|list| list.iter().map(|pos| &self.corpus.voices[*pos]).collect())
            .unwrap_or_default()
    }
}
