pub mod file;
pub mod subsystems;

use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs;
use crate::error::Result;
use log::{info, warn, trace};

pub trait FromIni {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoicemapConfig {
    // File paths
    pub files: file::FileConfig,

    // Subsystem configs
    pub filter: subsystems::FilterConfig,
    pub matcher: subsystems::MatcherConfig,
    pub embedding: subsystems::EmbeddingConfig,
    pub output: subsystems::OutputConfig,
}

impl VoicemapConfig {
    pub fn validate(&self) -> Result<()> {
        self.files.validate()?;
        self.filter.validate()?;
        self.matcher.validate()?;
        self.embedding.validate()?;
        self.output.validate()?;
        Ok(())
    }

    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        let absolute_path = std::fs::canonicalize(&path)
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        trace!("Loading configuration from: {:?}", absolute_path);

        let content = fs::read_to_string(&path)?;
        Self::from_ini_str(&content)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn from_ini_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_ini(path)
        } else {
            info!("No configuration at {:?}, using defaults", path.as_ref());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_ini_str(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len()-1].trim().to_string();
                trace!("  Line {}: Found section: [{}]", line_num + 1, current_section);
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Delegate to appropriate subsystem config
                if let Some(result) = match current_section.as_str() {
                    "file" => config.files.from_ini_section(&current_section, key, value),
                    "filter" => config.filter.from_ini_section(&current_section, key, value),
                    "matcher" => config.matcher.from_ini_section(&current_section, key, value),
                    "embedding" => config.embedding.from_ini_section(&current_section, key, value),
                    "output" => config.output.from_ini_section(&current_section, key, value),
                    _ => None,
                } {
                    // Invalid values are fatal, unknown keys are not
                    result?;
                } else {
                    warn!("Unrecognized config key: {}={} in section [{}]", key, value, current_section);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parses an INI boolean the way every subsystem does.
pub(crate) fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim_matches('"').to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(crate::error::Error::Config(
            format!("Invalid {} value (must be true/false): {}", key, value)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let ini = r#"
# voicemap settings
[file]
remake_voice_file = "tables/t_voice.json"
original_voice_file = voice_data.json
output_dir = out

[filter]
character_ids = 001, 002
match_battle = true

[matcher]
use_blockwise = false
similarity_threshold = 0.9

[embedding]
provider = none

[output]
map_failed_to_empty = false
log_level = debug
"#;
        let config = VoicemapConfig::from_ini_str(ini).unwrap();
        assert_eq!(config.files.remake_voice_file, Path::new("tables/t_voice.json"));
        assert_eq!(config.files.output_dir, Path::new("out"));
        assert_eq!(config.filter.character_ids, vec!["001".to_string(), "002".to_string()]);
        assert!(config.filter.match_battle);
        assert!(!config.matcher.use_blockwise);
        assert!((config.matcher.similarity_threshold - 0.9).abs() < 1e-6);
        assert_eq!(config.embedding.provider, subsystems::EmbeddingProviderKind::None);
        assert!(!config.output.map_failed_to_empty);
        assert_eq!(config.output.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let ini = "[matcher]\nsimilarity_threshold = 1.5\n";
        assert!(VoicemapConfig::from_ini_str(ini).is_err());

        let ini = "[filter]\nmatch_sfx = perhaps\n";
        assert!(VoicemapConfig::from_ini_str(ini).is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let ini = "[matcher]\nwhatever = 3\n[mystery]\nkey = value\n";
        let config = VoicemapConfig::from_ini_str(ini).unwrap();
        assert!(config.matcher.use_exact);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("voicemap.ini");
        let config = VoicemapConfig::from_ini(path).unwrap();
        let defaults = VoicemapConfig::default();
        assert_eq!(config.files.remake_voice_file, defaults.files.remake_voice_file);
        assert!(config.filter.character_ids.is_empty());
        assert!(config.matcher.use_semantic);
        assert_eq!(config.embedding.dimensions, defaults.embedding.dimensions);
        assert_eq!(config.output.empty_clip_name, "EMPTY");
    }

    #[test]
    fn precomputed_provider_requires_vectors_file() {
        let ini = "[embedding]\nprovider = precomputed\n";
        assert!(VoicemapConfig::from_ini_str(ini).is_err());
    }

    #[test]
    fn http_provider_keys_are_parsed() {
        let ini = "[embedding]\nprovider = http\nendpoint = http://localhost:8080/v1/embeddings\nmodel = \"local-model\"\napi_key_env =\nbatch_size = 32\n";
        let config = VoicemapConfig::from_ini_str(ini).unwrap();
        assert_eq!(config.embedding.provider, subsystems::EmbeddingProviderKind::Http);
        assert_eq!(config.embedding.endpoint, "http://localhost:8080/v1/embeddings");
        assert_eq!(config.embedding.model, "local-model");
        assert!(config.embedding.api_key_env.is_none());
        assert_eq!(config.embedding.batch_size, 32);

        let ini = "[embedding]\nprovider = http\nbatch_size = 0\n";
        assert!(VoicemapConfig::from_ini_str(ini).is_err());
    }
}
