use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use ahash::{AHashMap, AHashSet};
use log::debug;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::corpus::{id_from_value, RemakeTable};
use crate::error::Result;
use crate::parser::classify::classify_stem;
use crate::types::{RemakeId, UnmatchedRecord};
use super::{AlignmentReport, MatchedEntry};
use super::analysis::CharacterMapping;

const MATCH_RESULT_HEADER: [&str; 7] = [
    "RemakeVoiceId",
    "RemakeVoiceFilename",
    "RemakeVoiceCharacterId",
    "RemakeText",
    "OldVoiceFilename",
    "OldText",
    "MatchType",
];

/// One row of `match_result.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResultRow {
    #[serde(rename = "RemakeVoiceId")]
    pub remake_voice_id: String,
    #[serde(rename = "RemakeVoiceFilename")]
    pub remake_voice_filename: String,
    #[serde(rename = "RemakeVoiceCharacterId")]
    pub remake_voice_character_id: String,
    #[serde(rename = "RemakeText")]
    pub remake_text: String,
    #[serde(rename = "OldVoiceFilename")]
    pub old_voice_filename: String,
    #[serde(rename = "OldText")]
    pub old_text: String,
    #[serde(rename = "MatchType")]
    pub match_type: String,
}

fn field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// One row per remake table entry, in table order. Entries outside the
/// aligned set (filtered, malformed, repeated ids) are `skipped`.
pub fn match_result_rows(table: &RemakeTable, report: &AlignmentReport) -> Vec<MatchResultRow> {
    let matched: AHashMap<RemakeId, &MatchedEntry> =
        report.matched.iter().map(|m| (m.remake_id, m)).collect();
    let unmatched: AHashMap<RemakeId, &UnmatchedRecord> =
        report.unmatched.iter().map(|u| (u.remake_id, u)).collect();
    let mut seen: AHashSet<RemakeId> = AHashSet::new();

    table
        .entries()
        .iter()
        .map(|entry| {
            let filename = field(entry, "filename");
            let mut row = MatchResultRow {
                remake_voice_id: field(entry, "id"),
                remake_voice_character_id: classify_stem(&filename).character_id.unwrap_or_default(),
                remake_voice_filename: filename,
                remake_text: field(entry, "text"),
                old_voice_filename: String::new(),
                old_text: String::new(),
                match_type: "skipped".to_string(),
            };

            let id = match entry.get("id").and_then(id_from_value) {
                Some(id) if seen.insert(id) => id,
                _ => return row,
            };
            if let Some(m) = matched.get(&id) {
                row.old_voice_filename = m.clip_name();
                row.old_text = m.original_text.clone();
                row.match_type = m.match_type.clone();
            } else if unmatched.contains_key(&id) {
                row.match_type = "unmatched".to_string();
            }
            row
        })
        .collect()
}

pub fn write_match_result(path: &Path, table: &RemakeTable, report: &AlignmentReport) -> Result<()> {
    let rows = match_result_rows(table, report);
    // Header written by hand so an empty table still gets one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(MATCH_RESULT_HEADER)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

pub fn write_character_mapping(path: &Path, mapping: &[CharacterMapping]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(["RemakeVoiceCharacterId", "OldVoiceCharacterId"])?;
    for entry in mapping {
        writer.write_record([entry.remake_character_id.as_str(), entry.original_character_id.as_str()])?;
    }
    writer.flush()?;
    debug!("Wrote {} character mappings to {:?}", mapping.len(), path);
    Ok(())
}
