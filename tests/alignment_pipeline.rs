use ahash::{AHashMap, AHashSet};
use serde_json::json;

use voicemap::config::subsystems::{FilterConfig, MatcherConfig};
use voicemap::corpus::{OriginalCorpus, RemakeCorpus, RemakeTable};
use voicemap::embedding::EmbeddingProvider;
use voicemap::types::{Context, MatchKind, OriginalId, OriginalUtterance, ScenePosition};
use voicemap::{AlignmentPipeline, Error, Result};

/// Answers from a fixed table, zero vectors for anything else.
struct ScriptedProvider {
    vectors: AHashMap<String, Vec<f32>>,
}

impl ScriptedProvider {
    fn new(entries: &[(&str, [f32; 3])]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.to_vec()))
                .collect(),
        }
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| vec![0.0; 3]))
    }
}

struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("model unavailable"))
    }
}

fn remakes(texts: &[&str]) -> RemakeCorpus {
    let entries: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| json!({"id": i + 1, "text": text, "filename": format!("v001_00_{:04}", i + 1)}))
        .collect();
    let table = RemakeTable::from_document(json!(entries)).unwrap();
    RemakeCorpus::from_table(&table, &FilterConfig::default())
}

fn originals(lines: &[(&str, &str)]) -> OriginalCorpus {
    let records = lines
        .iter()
        .map(|(id, text)| OriginalUtterance {
            id: OriginalId::new(*id),
            text: text.to_string(),
            character_id: None,
            script_id: None,
            source_file: None,
            scene: ScenePosition::from_voice_id(id),
            context: Context::default(),
        })
        .collect();
    OriginalCorpus::from_records(records, None)
}

/// One scene of nine lines, `A` through `F` around three unnamed lines.
fn nine_line_scene() -> OriginalCorpus {
    originals(&[
        ("0000010001V", "A"),
        ("0000010002V", "B"),
        ("0000010003V", "C"),
        ("0000010004V", "p"),
        ("0000010005V", "q"),
        ("0000010006V", "r"),
        ("0000010007V", "D"),
        ("0000010008V", "E"),
        ("0000010009V", "F"),
    ])
}

fn original_of(alignment: &voicemap::Alignment, remake_id: u64) -> Option<String> {
    alignment
        .matches
        .iter()
        .find(|m| m.remake_id == remake_id)
        .map(|m| m.original_id.as_str().to_string())
}

#[test]
fn context_selects_the_later_ambiguous_original() {
    let corpus = originals(&[
        ("0000010001V", "前置き"),
        ("0000010002V", "ambiguous"),
        ("0000010003V", "後書き"),
        ("0000020001V", "Hello"),
        ("0000020002V", "ambiguous"),
        ("0000020003V", "World"),
    ]);
    let lines = remakes(&["Hello", "ambiguous", "World"]);

    // Text passes off so the ambiguous line reaches the triplet matcher
    let config = MatcherConfig {
        use_blockwise: false,
        use_exact: false,
        use_normalized: false,
        ..MatcherConfig::default()
    };
    let pipeline = AlignmentPipeline::new(config, corpus.clone(), None);
    let alignment = pipeline.run(&lines.utterances).unwrap();
    let record = alignment.matches.iter().find(|m| m.remake_id == 2).unwrap();
    assert_eq!(record.original_id.as_str(), "0000020002V");
    assert_eq!(record.kind, MatchKind::ContextTriplet);

    let pipeline = AlignmentPipeline::new(MatcherConfig::default(), corpus, None);
    let alignment = pipeline.run(&lines.utterances).unwrap();
    assert_eq!(original_of(&alignment, 2).as_deref(), Some("0000020002V"));
    assert_eq!(alignment.unmatched.len(), 0);
}

#[test]
fn equal_gaps_are_interpolated_in_order() {
    let lines = remakes(&["A", "B", "C", "x1", "x2", "x3", "D", "E", "F"]);
    let pipeline = AlignmentPipeline::new(MatcherConfig::default(), nine_line_scene(), None);
    let alignment = pipeline.run(&lines.utterances).unwrap();

    assert!(alignment.unmatched.is_empty());
    let filled: Vec<_> = alignment
        .matches
        .iter()
        .filter(|m| m.kind == MatchKind::AnchorInterpolated)
        .map(|m| (m.remake_id, m.original_id.as_str().to_string()))
        .collect();
    assert_eq!(
        filled,
        vec![
            (4, "0000010004V".to_string()),
            (5, "0000010005V".to_string()),
            (6, "0000010006V".to_string()),
        ]
    );
}

#[test]
fn unequal_gap_falls_through_to_semantic_matching() {
    let lines = remakes(&["A", "B", "C", "x1", "x2", "D", "E", "F"]);
    let provider = ScriptedProvider::new(&[
        ("C x1 x2", [1.0, 0.0, 0.0]),
        ("C p q", [1.0, 0.0, 0.0]),
        ("x1", [1.0, 0.0, 0.0]),
        ("p", [0.9, 0.1, 0.0]),
    ]);
    let pipeline = AlignmentPipeline::new(MatcherConfig::default(), nine_line_scene(), Some(Box::new(provider)));
    let alignment = pipeline.run(&lines.utterances).unwrap();

    assert_eq!(alignment.stats.blockwise, 6);
    let semantic = alignment.matches.iter().find(|m| m.remake_id == 4).unwrap();
    assert_eq!(semantic.original_id.as_str(), "0000010004V");
    assert!(matches!(semantic.kind, MatchKind::Semantic { score } if score > 0.85));

    let unmatched: Vec<u64> = alignment.unmatched.iter().map(|u| u.remake_id).collect();
    assert_eq!(unmatched, vec![5]);
}

#[test]
fn every_line_is_matched_or_unmatched_exactly_once() {
    let lines = remakes(&["A", "B", "C", "x1", "x2", "D", "E", "F", "A", "unknown"]);
    let pipeline = AlignmentPipeline::new(MatcherConfig::default(), nine_line_scene(), None);
    let alignment = pipeline.run(&lines.utterances).unwrap();

    let matched: AHashSet<u64> = alignment.matches.iter().map(|m| m.remake_id).collect();
    let unmatched: AHashSet<u64> = alignment.unmatched.iter().map(|u| u.remake_id).collect();
    assert!(matched.is_disjoint(&unmatched));
    assert_eq!(matched.len() + unmatched.len(), lines.utterances.len());

    let mut originals: Vec<&str> = alignment.matches.iter().map(|m| m.original_id.as_str()).collect();
    let before = originals.len();
    originals.sort();
    originals.dedup();
    assert_eq!(originals.len(), before, "an original was claimed twice");
    // The repeated "A" has nothing left to claim
    assert!(unmatched.contains(&9));
}

#[test]
fn repeated_runs_are_identical() {
    let lines = remakes(&["A", "B", "C", "x1", "x2", "D", "E", "F", "B"]);
    let run = || {
        let provider = ScriptedProvider::new(&[
            ("C x1 x2", [1.0, 0.0, 0.0]),
            ("C p q", [1.0, 0.0, 0.0]),
            ("x1", [1.0, 0.0, 0.0]),
            ("p", [0.9, 0.1, 0.0]),
        ]);
        let pipeline = AlignmentPipeline::new(MatcherConfig::default(), nine_line_scene(), Some(Box::new(provider)));
        let alignment = pipeline.run(&lines.utterances).unwrap();
        (
            serde_json::to_string(&alignment.matches).unwrap(),
            serde_json::to_string(&alignment.unmatched).unwrap(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn failing_provider_leaves_lines_unmatched() {
    let lines = remakes(&["A", "B", "C", "x1", "x2", "D", "E", "F"]);
    let pipeline = AlignmentPipeline::new(
        MatcherConfig::default(),
        nine_line_scene(),
        Some(Box::new(FailingProvider)),
    );
    let alignment = pipeline.run(&lines.utterances).unwrap();

    assert_eq!(alignment.stats.semantic, 0);
    let unmatched: Vec<u64> = alignment.unmatched.iter().map(|u| u.remake_id).collect();
    assert_eq!(unmatched, vec![4, 5]);
    assert_eq!(alignment.matches.len(), 6);
}
