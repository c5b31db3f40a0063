// src/config/subsystems/filter.rs

use serde::{Serialize, Deserialize};
use crate::error::Result;
use crate::config::{FromIni, parse_flag};
use crate::parser::classify::{Category, Classification, VoiceType};

/// Which remake lines enter the alignment core. Main dialogue is always in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub character_ids: Vec<String>,
    pub match_active: bool,
    pub match_battle: bool,
    pub match_other: bool,
    pub match_sfx: bool,
}

impl FromIni for FilterConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "filter" {
            return None;
        }

        match key {
            "character_ids" => {
                self.character_ids = value
                    .trim_matches('"')
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                Some(Ok(()))
            },
            "match_active" => Some(parse_flag(key, value).map(|flag| self.match_active = flag)),
            "match_battle" => Some(parse_flag(key, value).map(|flag| self.match_battle = flag)),
            "match_other" => Some(parse_flag(key, value).map(|flag| self.match_other = flag)),
            "match_sfx" => Some(parse_flag(key, value).map(|flag| self.match_sfx = flag)),
            _ => None,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        for id in &self.character_ids {
            if id.len() != 3 || !id.chars().all(|c| c.is_ascii_digit()) {
                log::warn!("Character id {:?} is not a 3-digit id and will never match", id);
            }
        }
        Ok(())
    }

    fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Main => true,
            Category::ActiveVoice => self.match_active,
            Category::Battle | Category::BattleVoice => self.match_battle,
            Category::Unknown => self.match_other,
            Category::System => false,
        }
    }

    /// Returns the skip reason for a line the filter keeps out, `None` when
    /// the line should be aligned.
    pub fn rejection_reason(&self, classification: &Classification) -> Option<String> {
        let admitted = match classification.voice_type {
            VoiceType::SoundEffect => self.match_sfx,
            VoiceType::CharacterVoice => classification
                .category
                .map(|c| self.category_enabled(c))
                .unwrap_or(false),
            VoiceType::Unknown => false,
        };
        if !admitted {
            return Some(format!(
                "category '{}' is not enabled",
                classification.label()
            ));
        }

        if !self.character_ids.is_empty() {
            let wanted = classification
                .character_id
                .as_ref()
                .map(|id| self.character_ids.contains(id))
                .unwrap_or(false);
            if !wanted {
                return Some(format!(
                    "character id {} is not selected",
                    classification.character_id.as_deref().unwrap_or("-")
                ));
            }
        }

        None
    }
}
