// src/output/table.rs

use std::path::Path;
use ahash::{AHashMap, AHashSet};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, info};
use serde_json::Value;

use crate::config::subsystems::OutputConfig;
use crate::corpus::{id_from_value, RemakeTable};
use crate::error::Result;
use crate::types::RemakeId;
use super::AlignmentReport;

pub const SILENT_CLIP_SAMPLE_RATE: u32 = 22_050;
pub const SILENT_CLIP_MS: u32 = 100;

/// Remake table with filenames pointed at the legacy clips.
#[derive(Debug, Clone)]
pub struct UpdatedTable {
    pub table: RemakeTable,
    pub matched: usize,
    pub emptied: usize,
}

/// Copies the table and rewrites `filename` for every matched entry to the
/// legacy clip stem. Unmatched entries point at the placeholder clip when
/// `map_failed_to_empty` is set; skipped entries are left untouched.
pub fn update_remake_table(table: &RemakeTable, report: &AlignmentReport, config: &OutputConfig) -> UpdatedTable {
    let clips: AHashMap<RemakeId, String> = report
        .matched
        .iter()
        .map(|m| (m.remake_id, m.clip_name()))
        .collect();
    let unmatched: AHashSet<RemakeId> = report.unmatched.iter().map(|u| u.remake_id).collect();

    let mut updated = table.clone();
    let mut matched = 0;
    let mut emptied = 0;

    if let Some(entries) = updated.entries_mut() {
        for entry in entries.iter_mut() {
            let id = match entry.get("id").and_then(id_from_value) {
                Some(id) => id,
                None => continue,
            };
            let filename = if let Some(clip) = clips.get(&id) {
                matched += 1;
                clip.clone()
            } else if config.map_failed_to_empty && unmatched.contains(&id) {
                emptied += 1;
                config.empty_clip_name.clone()
            } else {
                continue;
            };
            if let Some(object) = entry.as_object_mut() {
                object.insert("filename".to_string(), Value::String(filename));
            }
        }
    }

    info!("Remake table: {} entries remapped, {} pointed at {}", matched, emptied, config.empty_clip_name);
    UpdatedTable { table: updated, matched, emptied }
}

/// Mono 16-bit silence used as the stand-in for lines without a legacy clip.
pub fn write_silent_clip<P: AsRef<Path>>(path: P, duration_ms: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SILENT_CLIP_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let samples = SILENT_CLIP_SAMPLE_RATE * duration_ms / 1000;

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for _ in 0..samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    debug!("Wrote {} ms of silence to {:?}", duration_ms, path.as_ref());
    Ok(())
}
