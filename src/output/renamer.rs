// src/output/renamer.rs

use std::fs;
use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::error::{Error, Result};
use super::tabular::MatchResultRow;

/// Directory used when no character filter is given.
pub const ALL_CHARACTERS_DIR: &str = "all";

/// Counters of a completed copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: Vec<PathBuf>,
    /// Legacy clips named in the table but absent from the source directory.
    pub missing: Vec<PathBuf>,
    /// Selected rows without a legacy clip (unmatched or skipped).
    pub unmapped: usize,
}

/// Legacy clips renamed to the remake file names listed in `match_result.csv`.
pub struct ClipRenamer {
    old_voice_dir: PathBuf,
    output_dir: PathBuf,
    character_ids: Vec<String>,
}

fn with_wav_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".wav") {
        name.to_string()
    } else {
        format!("{}.wav", name)
    }
}

/// Ids compare numerically when both sides are numbers, so `1` selects `001`.
fn same_character(wanted: &str, row: &str) -> bool {
    match (wanted.parse::<u64>(), row.parse::<u64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => wanted == row,
    }
}

pub fn read_match_result<P: AsRef<Path>>(path: P) -> Result<Vec<MatchResultRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<MatchResultRow>, _>>()
        .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
    debug!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

impl ClipRenamer {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(old_voice_dir: P, output_dir: Q, character_ids: &[String]) -> Self {
        Self {
            old_voice_dir: old_voice_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            character_ids: character_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Rows kept by the character filter, in table order.
    pub fn select<'a>(&self, rows: &'a [MatchResultRow]) -> Vec<&'a MatchResultRow> {
        rows.iter()
            .filter(|row| {
                self.character_ids.is_empty()
                    || self
                        .character_ids
                        .iter()
                        .any(|id| same_character(id, &row.remake_voice_character_id))
            })
            .collect()
    }

    /// `<output>/<character id>/wav` with a filter, `<output>/all/wav` without.
    pub fn target_dir(&self, row: &MatchResultRow) -> PathBuf {
        let group = if self.character_ids.is_empty() {
            ALL_CHARACTERS_DIR
        } else {
            row.remake_voice_character_id.as_str()
        };
        self.output_dir.join(group).join("wav")
    }

    pub fn copy_rows(&self, rows: &[MatchResultRow]) -> Result<CopySummary> {
        let selected = self.select(rows);
        let mut summary = CopySummary::default();
        if selected.is_empty() {
            info!("No matching voice files to process");
            return Ok(summary);
        }

        let progress = ProgressBar::new(selected.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clips ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for row in selected {
            progress.inc(1);
            if row.old_voice_filename.trim().is_empty() {
                debug!("{}: no legacy clip ({})", row.remake_voice_filename, row.match_type);
                summary.unmapped += 1;
                continue;
            }
            let source = self.old_voice_dir.join(with_wav_extension(row.old_voice_filename.trim()));
            if !source.exists() {
                warn!("Source file not found, skipping: {:?}", source);
                summary.missing.push(source);
                continue;
            }

            let dir = self.target_dir(row);
            fs::create_dir_all(&dir)?;
            let target = dir.join(with_wav_extension(&row.remake_voice_filename));
            fs::copy(&source, &target)?;
            summary.copied.push(target);
        }
        progress.finish_and_clear();

        info!(
            "Copied {} clips to {:?} ({} missing, {} without a legacy clip)",
            summary.copied.len(),
            self.output_dir,
            summary.missing.len(),
            summary.unmapped
        );
        Ok(summary)
    }

    pub fn copy_from_csv<P: AsRef<Path>>(&self, csv_path: P) -> Result<CopySummary> {
        let rows = read_match_result(csv_path)?;
        self.copy_rows(&rows)
    }
}
