// src/config/subsystems/matcher.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::{FromIni, parse_flag};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Switches for the alignment passes and the semantic acceptance threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub use_exact: bool,
    pub use_normalized: bool,
    pub use_blockwise: bool,
    pub use_verifier: bool,
    pub use_context_triplet: bool,
    pub use_semantic: bool,
    /// Both semantic checks must score strictly above this.
    pub similarity_threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            use_exact: true,
            use_normalized: true,
            use_blockwise: true,
            use_verifier: true,
            use_context_triplet: true,
            use_semantic: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl FromIni for MatcherConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "matcher" {
            return None;
        }

        match key {
            "use_exact" => Some(parse_flag(key, value).map(|flag| self.use_exact = flag)),
            "use_normalized" => Some(parse_flag(key, value).map(|flag| self.use_normalized = flag)),
            "use_blockwise" => Some(parse_flag(key, value).map(|flag| self.use_blockwise = flag)),
            "use_verifier" => Some(parse_flag(key, value).map(|flag| self.use_verifier = flag)),
            "use_context_triplet" => {
                Some(parse_flag(key, value).map(|flag| self.use_context_triplet = flag))
            },
            "use_semantic" => Some(parse_flag(key, value).map(|flag| self.use_semantic = flag)),
            "similarity_threshold" => {
                match value.parse::<f32>() {
                    Ok(threshold) if threshold > 0.0 && threshold <= 1.0 => {
                        self.similarity_threshold = threshold;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid similarity_threshold (must be in (0, 1]): {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::Config(
                "similarity_threshold must be in (0, 1]".to_string()
            ));
        }
        if !self.use_exact && !self.use_normalized && !self.use_blockwise
            && !self.use_context_triplet && !self.use_semantic
        {
            log::warn!("Every matching pass is disabled; all lines will be unmatched");
        }
        Ok(())
    }

    /// Short description of the enabled passes, for the run log.
    pub fn describe(&self) -> String {
        let mut passes = Vec::new();
        if self.use_blockwise {
            passes.push("blockwise");
        }
        if self.use_exact {
            passes.push("exact");
        }
        if self.use_normalized {
            passes.push("normalized");
        }
        if self.use_verifier {
            passes.push("verifier");
        }
        if self.use_context_triplet {
            passes.push("context-triplet");
        }
        if self.use_semantic {
            passes.push("semantic");
        }
        if passes.is_empty() {
            "no passes enabled".to_string()
        } else {
            passes.join(" -> ")
        }
    }
}
