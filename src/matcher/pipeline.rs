// src/matcher/pipeline.rs

use std::time::Instant;
use log::{info, warn};
use serde::{Serialize, Deserialize};

use crate::config::subsystems::MatcherConfig;
use crate::corpus::OriginalCorpus;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::types::{MatchRecord, RemakeUtterance, UnmatchedRecord};
use super::audit::{AuditLog, Pass};
use super::index::CandidateIndex;
use super::semantic::SemanticIndex;
use super::state::{AlignmentState, LineState};
use super::{blockwise, exact, triplet, verifier, semantic};

/// Per-pass counters for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub total: usize,
    pub blockwise: usize,
    pub exact: usize,
    pub normalized: usize,
    pub verified: usize,
    pub kept_unique: usize,
    pub reverted: usize,
    pub context_triplet: usize,
    pub semantic: usize,
    pub unmatched: usize,
}

impl PassStats {
    pub fn matched(&self) -> usize {
        self.total - self.unmatched
    }
}

/// Outcome of a full run. Every remake line given to `run` appears in
/// exactly one of `matches` and `unmatched`, both sorted by remake id.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub matches: Vec<MatchRecord>,
    pub unmatched: Vec<UnmatchedRecord>,
    pub audit: AuditLog,
    pub stats: PassStats,
}

/// Runs the passes in order over one remake corpus:
/// blockwise, exact/normalized, verifier, context triplet, semantic.
pub struct AlignmentPipeline {
    config: MatcherConfig,
    index: CandidateIndex,
    provider: Option<Box<dyn EmbeddingProvider>>,
}

impl AlignmentPipeline {
    pub fn new(config: MatcherConfig, corpus: OriginalCorpus, provider: Option<Box<dyn EmbeddingProvider>>) -> Self {
        Self {
            config,
            index: CandidateIndex::new(corpus),
            provider,
        }
    }

    pub fn index(&self) -> &CandidateIndex {
        &self.index
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// The embedding index is built here, once per run. A provider that fails
    /// on the corpus disables the semantic pass.
    fn semantic_index(&self) -> Option<(SemanticIndex, &dyn EmbeddingProvider)> {
        if !self.config.use_semantic {
            return None;
        }
        let provider = self.provider.as_deref()?;
        match SemanticIndex::build(&self.index, provider) {
            Ok(index) => Some((index, provider)),
            Err(e) => {
                warn!("Semantic matching disabled: {}", e);
                None
            }
        }
    }

    pub fn run(&self, remakes: &[RemakeUtterance]) -> Result<Alignment> {
        let start_time = Instant::now();
        let mut lines = remakes.to_vec();
        lines.sort_by_key(|r| r.id);
        lines.dedup_by_key(|r| r.id);

        let ids: Vec<_> = lines.iter().map(|r| r.id).collect();
        let mut state = AlignmentState::new(&ids);
        let mut stats = PassStats {
            total: lines.len(),
            ..PassStats::default()
        };
        info!("Aligning {} remake lines against {} original lines", lines.len(), self.index.voices().len());

        if self.config.use_blockwise {
            stats.blockwise = blockwise::run(&lines, &self.index, &mut state)?;
        }

        if self.config.use_exact || self.config.use_normalized {
            let counts = exact::run(&lines, &self.index, &mut state, &self.config)?;
            stats.exact = counts.exact;
            stats.normalized = counts.normalized;
        }

        if self.config.use_verifier {
            let counts = verifier::run(&lines, &self.index, &mut state)?;
            stats.verified = counts.confirmed;
            stats.kept_unique = counts.kept;
            stats.reverted = counts.reverted;
        }

        if self.config.use_context_triplet {
            stats.context_triplet = triplet::run(&lines, &self.index, &mut state)?;
        }

        match self.semantic_index() {
            Some((semantic_index, provider)) => {
                stats.semantic = semantic::run(
                    &lines,
                    &self.index,
                    &semantic_index,
                    provider,
                    self.config.similarity_threshold,
                    &mut state,
                )?;
            },
            None => info!("Semantic pass skipped"),
        }

        // Whatever is still pending has exhausted every pass
        for id in state.pending_ids() {
            state.mark_unmatched(id, Pass::Finalize, "no pass produced an accepted match".to_string())?;
        }
        state.check_invariants()?;

        let (states, matches, audit) = state.into_parts();
        let matches: Vec<MatchRecord> = matches.into_values().collect();
        let unmatched: Vec<UnmatchedRecord> = lines
            .iter()
            .filter(|r| states.get(&r.id) == Some(&LineState::Unmatched))
            .map(|r| UnmatchedRecord {
                remake_id: r.id,
                filename: r.filename.clone(),
                text: r.text.clone(),
            })
            .collect();
        stats.unmatched = unmatched.len();

        info!(
            "Alignment finished in {:.2?}: {} matched, {} unmatched",
            start_time.elapsed(),
            matches.len(),
            unmatched.len()
        );
        Ok(Alignment { matches, unmatched, audit, stats })
    }
}
