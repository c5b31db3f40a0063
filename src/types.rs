use serde::{Serialize, Deserialize};
use std::fmt;

use crate::parser::classify::Classification;

/// Remake lines are keyed by the numeric id of the remake voice table.
pub type RemakeId = u64;

/// Identifier of a legacy voice clip, e.g. `0940010128V`.
///
/// Ordering is plain string ordering, which matches script order for the
/// fixed-width ids the legacy scripts use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginalId(pub String);

impl OriginalId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        OriginalId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the leading run of ASCII digits (`0940010128V` -> 940010128).
    pub fn numeric(&self) -> Option<u64> {
        let digits: &str = {
            let end = self.0
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(self.0.len());
            &self.0[..end]
        };
        if digits.is_empty() {
            return None;
        }
        digits.parse().ok()
    }

    /// Stem of the legacy clip file: `ch` followed by the id without its
    /// trailing type marker.
    pub fn clip_name(&self) -> String {
        let mut chars = self.0.chars();
        chars.next_back();
        format!("ch{}", chars.as_str())
    }
}

impl fmt::Display for OriginalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text of the neighbouring lines. Empty means no neighbour or a group
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub prev: String,
    pub next: String,
}

/// Scene and in-scene sequence parsed from a legacy voice id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenePosition {
    pub scene_id: String,
    pub seq: u32,
}

impl ScenePosition {
    /// Parses the fixed-width layout `ccc sss qqqq V`: scene at `[3..6)`,
    /// sequence at `[6..10)`.
    pub fn from_voice_id(voice_id: &str) -> Option<Self> {
        if voice_id.len() < 10 || !voice_id.is_char_boundary(10) {
            return None;
        }
        let scene = voice_id.get(3..6)?;
        let seq = voice_id.get(6..10)?;
        if !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            scene_id: scene.to_string(),
            seq: seq.parse().ok()?,
        })
    }
}

/// Common view over both corpora used by the context annotator.
pub trait Utterance {
    fn text(&self) -> &str;
    fn context(&self) -> &Context;
    fn context_mut(&mut self) -> &mut Context;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemakeUtterance {
    pub id: RemakeId,
    pub text: String,
    pub filename: String,
    pub classification: Classification,
    #[serde(default)]
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalUtterance {
    pub id: OriginalId,
    pub text: String,
    pub character_id: Option<String>,
    pub script_id: Option<String>,
    pub source_file: Option<String>,
    pub scene: Option<ScenePosition>,
    #[serde(default)]
    pub context: Context,
}

impl Utterance for RemakeUtterance {
    fn text(&self) -> &str {
        &self.text
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

impl Utterance for OriginalUtterance {
    fn text(&self) -> &str {
        &self.text
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

/// How a match was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Normalized,
    ContextTriplet,
    AnchorInterpolated,
    Semantic { score: f32 },
}

impl MatchKind {
    pub fn label(&self) -> String {
        match self {
            MatchKind::Exact => "exact".to_string(),
            MatchKind::Normalized => "normalized".to_string(),
            MatchKind::ContextTriplet => "context_triplet".to_string(),
            MatchKind::AnchorInterpolated => "anchor_interpolated".to_string(),
            MatchKind::Semantic { score } => format!("semantic ({:.2})", score),
        }
    }

    /// Exact and normalized matches are the ones the context verifier
    /// re-checks.
    pub fn is_textual(&self) -> bool {
        matches!(self, MatchKind::Exact | MatchKind::Normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub remake_id: RemakeId,
    pub original_id: OriginalId,
    pub kind: MatchKind,
    pub remake_text: String,
    pub original_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    pub remake_id: RemakeId,
    pub filename: String,
    pub text: String,
}

/// A remake record kept out of the alignment core, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub remake_id: Option<RemakeId>,
    pub filename: Option<String>,
    pub text: Option<String>,
    pub reason: String,
}
