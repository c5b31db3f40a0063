// src/parser/classify.rs

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Deserialize};

lazy_static! {
    // v<character>_<category>_<number>.wav, e.g. v001_00_0001.wav, v327_gs_0002.wav
    static ref CATEGORY_VOICE: Regex = Regex::new(r"^v(\d{3})_(\w{2})_(\d{4}[br]?)\.wav$").unwrap();
    // v<character>_<b|s><number>.wav, e.g. v001_b0001.wav, v001_b0118b.wav
    static ref BATTLE_SYSTEM_VOICE: Regex = Regex::new(r"^v(\d{3})_([bs])(\d{4}[br]?)\.wav$").unwrap();
    static ref SOUND_EFFECT: Regex = Regex::new(r"^v_se_(.*)\.wav$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    CharacterVoice,
    SoundEffect,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Main,
    ActiveVoice,
    BattleVoice,
    Battle,
    System,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::ActiveVoice => "active_voice",
            Category::BattleVoice => "battle_voice",
            Category::Battle => "battle",
            Category::System => "system",
            Category::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub voice_type: VoiceType,
    pub character_id: Option<String>,
    pub category: Option<Category>,
    pub number: Option<String>,
    pub description: Option<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            voice_type: VoiceType::Unknown,
            character_id: None,
            category: None,
            number: None,
            description: None,
        }
    }

    /// Category name, or the voice type when the file has no category.
    pub fn label(&self) -> &'static str {
        match (self.category, self.voice_type) {
            (Some(category), _) => category.as_str(),
            (None, VoiceType::CharacterVoice) => "character_voice",
            (None, VoiceType::SoundEffect) => "sound_effect",
            (None, VoiceType::Unknown) => "unknown",
        }
    }
}

/// Classifies a remake clip by its file name (`.wav` included).
pub fn classify(filename: &str) -> Classification {
    if let Some(caps) = CATEGORY_VOICE.captures(filename) {
        let code = &caps[2];
        let category = if code.chars().all(|c| c.is_ascii_digit()) {
            Category::Main
        } else {
            match code {
                "av" => Category::ActiveVoice,
                "bv" => Category::BattleVoice,
                _ => Category::Unknown,
            }
        };
        return Classification {
            voice_type: VoiceType::CharacterVoice,
            character_id: Some(caps[1].to_string()),
            category: Some(category),
            number: Some(caps[3].to_string()),
            description: None,
        };
    }

    if let Some(caps) = BATTLE_SYSTEM_VOICE.captures(filename) {
        let category = match &caps[2] {
            "b" => Category::Battle,
            "s" => Category::System,
            _ => Category::Unknown,
        };
        return Classification {
            voice_type: VoiceType::CharacterVoice,
            character_id: Some(caps[1].to_string()),
            category: Some(category),
            number: Some(caps[3].to_string()),
            description: None,
        };
    }

    if let Some(caps) = SOUND_EFFECT.captures(filename) {
        return Classification {
            voice_type: VoiceType::SoundEffect,
            description: Some(caps[1].to_string()),
            ..Classification::unknown()
        };
    }

    Classification::unknown()
}

/// Remake tables store the stem only.
pub fn classify_stem(stem: &str) -> Classification {
    classify(&format!("{}.wav", stem))
}
