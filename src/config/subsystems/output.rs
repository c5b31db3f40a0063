// src/config/subsystems/output.rs

use serde::{Serialize, Deserialize};
use log::LevelFilter;
use crate::error::{Error, Result};
use crate::config::{FromIni, parse_flag};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Point unmatched remake entries at a silent placeholder clip.
    pub map_failed_to_empty: bool,
    pub empty_clip_name: String,
    pub write_context_report: bool,
    pub write_character_mapping: bool,
    pub log_level: String,
    #[serde(skip)]
    level_filter: Option<LevelFilter>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_failed_to_empty: true,
            empty_clip_name: "EMPTY".to_string(),
            write_context_report: true,
            write_character_mapping: true,
            log_level: "info".to_string(),
            level_filter: Some(LevelFilter::Info),
        }
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level {
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        "none" => Some(LevelFilter::Off),
        _ => None,
    }
}

impl FromIni for OutputConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "output" {
            return None;
        }

        match key {
            "map_failed_to_empty" => {
                Some(parse_flag(key, value).map(|flag| self.map_failed_to_empty = flag))
            },
            "empty_clip_name" => {
                let name = value.trim_matches('"');
                if name.is_empty() {
                    return Some(Err(Error::Config("empty_clip_name must not be empty".to_string())));
                }
                self.empty_clip_name = name.to_string();
                Some(Ok(()))
            },
            "write_context_report" => {
                Some(parse_flag(key, value).map(|flag| self.write_context_report = flag))
            },
            "write_character_mapping" => {
                Some(parse_flag(key, value).map(|flag| self.write_character_mapping = flag))
            },
            "log_level" => {
                let level_str = value.trim_matches('"').trim().to_lowercase();
                Some(match parse_level(&level_str) {
                    Some(filter) => {
                        self.log_level = level_str;
                        self.level_filter = Some(filter);
                        Ok(())
                    },
                    None => Err(Error::Config(
                        format!("Invalid log_level (error|warn|info|debug|trace|none): {}", value)
                    )),
                })
            },
            _ => None,
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.empty_clip_name.is_empty() {
            return Err(Error::Config("empty_clip_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn log_level(&self) -> LevelFilter {
        // If we have a cached level, return it
        if let Some(level) = self.level_filter {
            return level;
        }
        parse_level(&self.log_level.trim().to_lowercase()).unwrap_or(LevelFilter::Info)
    }

    pub fn set_log_level(&mut self, level: LevelFilter) {
        self.log_level = match level {
            LevelFilter::Off => "none".to_string(),
            other => other.as_str().to_lowercase(),
        };
        self.level_filter = Some(level);
    }
}
