// src/config/file.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use super::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub remake_voice_file: PathBuf,
    pub original_voice_file: PathBuf,
    /// Script-ordered dump of the legacy lines. The voice file is reused in
    /// script order when unset.
    pub original_script_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            remake_voice_file: PathBuf::from("t_voice.json"),
            original_voice_file: PathBuf::from("voice_data.json"),
            original_script_file: Some(PathBuf::from("script_data.json")),
            output_dir: PathBuf::from("output"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl FromIni for FileConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        let value = value.trim_matches('"');
        match key {
            "remake_voice_file" => {
                self.remake_voice_file = PathBuf::from(value);
                Some(Ok(()))
            },
            "original_voice_file" => {
                self.original_voice_file = PathBuf::from(value);
                Some(Ok(()))
            },
            "original_script_file" => {
                self.original_script_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
                Some(Ok(()))
            },
            "output_dir" => {
                self.output_dir = PathBuf::from(value);
                Some(Ok(()))
            },
            "log_dir" => {
                self.log_dir = PathBuf::from(value);
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.remake_voice_file.as_os_str().is_empty() {
            return Err(Error::Config("remake_voice_file must be set".to_string()));
        }
        if self.original_voice_file.as_os_str().is_empty() {
            return Err(Error::Config("original_voice_file must be set".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must be set".to_string()));
        }
        Ok(())
    }

    /// Creates the output and log directories if they don't exist.
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
