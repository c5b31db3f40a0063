// src/matcher/semantic.rs

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::embedding::{cosine_similarity, nearest, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::types::{MatchKind, OriginalId, RemakeUtterance, Utterance};
use super::audit::{AuditEvent, Pass};
use super::index::CandidateIndex;
use super::state::AlignmentState;

/// `prev text next`, trimmed at both ends.
pub fn contextual_text<U: Utterance>(utterance: &U) -> String {
    let context = utterance.context();
    format!("{} {} {}", context.prev, utterance.text(), context.next)
        .trim()
        .to_string()
}

/// Embeddings of the script corpus's contextual strings, row `i` belonging
/// to `index.script()[i]`. Built once per run.
pub struct SemanticIndex {
    vectors: Vec<Vec<f32>>,
}

impl SemanticIndex {
    pub fn build(index: &CandidateIndex, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let texts: Vec<String> = index.script().iter().map(contextual_text).collect();
        let vectors = provider.encode_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "{} returned {} vectors for {} texts",
                provider.name(),
                vectors.len(),
                texts.len()
            )));
        }
        info!("Semantic index: {} script lines encoded with {}", vectors.len(), provider.name());
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

enum Outcome {
    Accepted,
    Rejected(Option<OriginalId>, String),
}

fn try_line(
    remake: &RemakeUtterance,
    index: &CandidateIndex,
    semantic: &SemanticIndex,
    provider: &dyn EmbeddingProvider,
    threshold: f32,
    state: &mut AlignmentState,
) -> Result<Outcome> {
    let query = provider.encode(&contextual_text(remake))?;
    let (row, score) = match nearest(&query, &semantic.vectors, 1).first() {
        Some(hit) => *hit,
        None => return Ok(Outcome::Rejected(None, "empty semantic index".to_string())),
    };
    let candidate = match index.script().get(row) {
        Some(candidate) => candidate,
        None => return Ok(Outcome::Rejected(None, format!("row {} outside the script", row))),
    };
    if score <= threshold {
        return Ok(Outcome::Rejected(
            Some(candidate.id.clone()),
            format!("context similarity {:.3} not above {:.2}", score, threshold),
        ));
    }
    if let Some(holder) = state.reservations().holder(&candidate.id) {
        return Ok(Outcome::Rejected(
            Some(candidate.id.clone()),
            format!("nearest line already reserved by remake {}", holder),
        ));
    }

    // Guard against a shared context carrying an unrelated line
    let text_score = cosine_similarity(&provider.encode(&remake.text)?, &provider.encode(&candidate.text)?);
    if text_score <= threshold {
        return Ok(Outcome::Rejected(
            Some(candidate.id.clone()),
            format!("text similarity {:.3} not above {:.2}", text_score, threshold),
        ));
    }

    if state.try_commit(remake, candidate, MatchKind::Semantic { score }, Pass::Semantic)? {
        Ok(Outcome::Accepted)
    } else {
        Ok(Outcome::Rejected(Some(candidate.id.clone()), "reservation lost".to_string()))
    }
}

/// Last resort for every pending line. Lines that fail here stay pending and
/// are marked unmatched by the pipeline.
pub fn run(
    remakes: &[RemakeUtterance],
    index: &CandidateIndex,
    semantic: &SemanticIndex,
    provider: &dyn EmbeddingProvider,
    threshold: f32,
    state: &mut AlignmentState,
) -> Result<usize> {
    let pending: Vec<&RemakeUtterance> = remakes.iter().filter(|r| state.is_pending(r.id)).collect();
    let progress = ProgressBar::new(pending.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} semantic ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut accepted = 0;
    for remake in pending {
        match try_line(remake, index, semantic, provider, threshold, state) {
            Ok(Outcome::Accepted) => accepted += 1,
            Ok(Outcome::Rejected(original_id, reason)) => {
                debug!("Semantic: {} rejected: {}", remake.id, reason);
                state.note(remake.id, Pass::Semantic, AuditEvent::Rejected { original_id, reason });
            },
            Err(Error::Embedding(reason)) => {
                warn!("Semantic: cannot encode line {}: {}", remake.id, reason);
                state.note(remake.id, Pass::Semantic, AuditEvent::Rejected {
                    original_id: None,
                    reason: format!("embedding failed: {}", reason),
                });
            },
            Err(e) => {
                progress.abandon();
                return Err(e);
            },
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!("Semantic pass: {} accepted above {:.2}", accepted, threshold);
    Ok(accepted)
}
