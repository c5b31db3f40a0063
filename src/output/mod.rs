pub mod analysis;
pub mod renamer;
pub mod table;
pub mod tabular;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use ahash::AHashMap;
use log::info;
use serde::{Serialize, Deserialize};

use crate::config::subsystems::OutputConfig;
use crate::corpus::{RemakeCorpus, RemakeTable};
use crate::error::Result;
use crate::matcher::{Alignment, AuditLog, CandidateIndex, PassStats};
use crate::parser::classify::Classification;
use crate::types::{MatchKind, OriginalId, RemakeId, RemakeUtterance, SkippedRecord, UnmatchedRecord};

/// One matched remake line joined with everything known about its original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedEntry {
    pub remake_id: RemakeId,
    pub remake_filename: String,
    pub remake_text: String,
    pub original_id: OriginalId,
    pub original_text: String,
    pub scene_id: Option<String>,
    pub scene_seq: Option<u32>,
    pub character_id: Option<String>,
    pub source_file: Option<String>,
    /// Human readable kind, e.g. `semantic (0.91)`.
    pub match_type: String,
    pub match_kind: MatchKind,
    pub classification: Classification,
}

impl MatchedEntry {
    /// Legacy clip stem the remake entry is pointed at.
    pub fn clip_name(&self) -> String {
        self.original_id.clip_name()
    }
}

/// The three partitions handed to the writers.
#[derive(Debug, Clone)]
pub struct AlignmentReport {
    pub matched: Vec<MatchedEntry>,
    pub unmatched: Vec<UnmatchedRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub stats: PassStats,
}

impl AlignmentReport {
    /// Joins the pipeline result with the remake lines and the original
    /// corpus. Partitions are sorted by remake id.
    pub fn assemble(alignment: &Alignment, remakes: &RemakeCorpus, index: &CandidateIndex) -> Self {
        let by_id: AHashMap<RemakeId, &RemakeUtterance> =
            remakes.utterances.iter().map(|r| (r.id, r)).collect();

        let mut matched: Vec<MatchedEntry> = alignment
            .matches
            .iter()
            .filter_map(|record| {
                let remake = by_id.get(&record.remake_id)?;
                let original = index.get(&record.original_id);
                Some(MatchedEntry {
                    remake_id: record.remake_id,
                    remake_filename: remake.filename.clone(),
                    remake_text: record.remake_text.clone(),
                    original_id: record.original_id.clone(),
                    original_text: record.original_text.clone(),
                    scene_id: original.and_then(|o| o.scene.as_ref()).map(|s| s.scene_id.clone()),
                    scene_seq: original.and_then(|o| o.scene.as_ref()).map(|s| s.seq),
                    character_id: original.and_then(|o| o.character_id.clone()),
                    source_file: original.and_then(|o| o.source_file.clone()),
                    match_type: record.kind.label(),
                    match_kind: record.kind,
                    classification: remake.classification.clone(),
                })
            })
            .collect();
        matched.sort_by_key(|m| m.remake_id);

        let mut unmatched = alignment.unmatched.clone();
        unmatched.sort_by_key(|u| u.remake_id);

        Self {
            matched,
            unmatched,
            skipped: remakes.skipped.clone(),
            stats: alignment.stats.clone(),
        }
    }
}

/// Paths and counters of a completed write.
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    pub files: Vec<PathBuf>,
    pub updated_entries: usize,
    pub empty_entries: usize,
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Writes every artifact of a run under one directory.
pub struct ArtifactWriter<'a> {
    output_dir: PathBuf,
    config: &'a OutputConfig,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new<P: AsRef<Path>>(output_dir: P, config: &'a OutputConfig) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        write_json(&path, value)?;
        Ok(path)
    }

    pub fn write_all(
        &self,
        report: &AlignmentReport,
        audit: &AuditLog,
        remake_table: &RemakeTable,
        index: &CandidateIndex,
    ) -> Result<OutputSummary> {
        fs::create_dir_all(&self.output_dir)?;
        let mut summary = OutputSummary::default();

        summary.files.push(self.write_json("merged_voice_data.json", &report.matched)?);
        summary.files.push(self.write_json("unmatched_voice_data.json", &report.unmatched)?);
        summary.files.push(self.write_json("skipped_voice_data.json", &report.skipped)?);
        summary.files.push(self.write_json("audit_log.json", audit.entries())?);

        let csv_path = self.path("match_result.csv");
        tabular::write_match_result(&csv_path, remake_table, report)?;
        summary.files.push(csv_path);

        let updated = table::update_remake_table(remake_table, report, self.config);
        summary.files.push(self.write_json("t_voice.json", &updated.table.document)?);
        summary.updated_entries = updated.matched;
        summary.empty_entries = updated.emptied;

        if self.config.map_failed_to_empty {
            let wav_dir = self.output_dir.join("voice").join("wav");
            fs::create_dir_all(&wav_dir)?;
            let wav_path = wav_dir.join(format!("{}.wav", self.config.empty_clip_name));
            table::write_silent_clip(&wav_path, table::SILENT_CLIP_MS)?;
            summary.files.push(wav_path);
        }

        if self.config.write_character_mapping {
            let path = self.path("voice_id_mapping.csv");
            tabular::write_character_mapping(&path, &analysis::character_mapping(&report.matched))?;
            summary.files.push(path);
        }

        if self.config.write_context_report {
            let context_report = analysis::context_report(report, index);
            summary.files.push(self.write_json("context_analysis_report.json", &context_report)?);
        }

        info!(
            "Wrote {} artifacts to {:?} ({} entries remapped, {} pointed at {})",
            summary.files.len(),
            self.output_dir,
            summary.updated_entries,
            summary.empty_entries,
            self.config.empty_clip_name
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::subsystems::{FilterConfig, MatcherConfig};
    use crate::corpus::OriginalCorpus;
    use crate::matcher::AlignmentPipeline;
    use crate::types::{Context, OriginalUtterance, ScenePosition};
    use serde_json::json;

    fn original(id: &str, text: &str) -> OriginalUtterance {
        OriginalUtterance {
            id: OriginalId::new(id),
            text: text.to_string(),
            character_id: Some("094".to_string()),
            script_id: None,
            source_file: Some("ev0001.bin".to_string()),
            scene: ScenePosition::from_voice_id(id),
            context: Context::default(),
        }
    }

    #[test]
    fn report_joins_both_corpora() {
        let table = RemakeTable::from_document(json!([
            {"id": 1, "text": "行くぞ", "filename": "v001_00_0001"},
            {"id": 2, "text": "知らない台詞", "filename": "v001_00_0002"},
            {"id": 3, "text": "戦闘開始", "filename": "v001_b0001"}
        ]))
        .unwrap();
        let remakes = RemakeCorpus::from_table(&table, &FilterConfig::default());
        let corpus = OriginalCorpus::from_records(vec![original("0940010001V", "行くぞ")], None);
        let pipeline = AlignmentPipeline::new(MatcherConfig::default(), corpus, None);
        let alignment = pipeline.run(&remakes.utterances).unwrap();

        let report = AlignmentReport::assemble(&alignment, &remakes, pipeline.index());
        assert_eq!(report.matched.len(), 1);
        let entry = &report.matched[0];
        assert_eq!(entry.clip_name(), "ch0940010001");
        assert_eq!(entry.scene_id.as_deref(), Some("001"));
        assert_eq!(entry.source_file.as_deref(), Some("ev0001.bin"));
        assert_eq!(entry.match_type, "exact");
        assert_eq!(report.unmatched.len(), 1);
        // Battle lines are filtered out by default
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn largest_remake_id_runs_through_to_the_reports() {
        let table = RemakeTable::from_document(json!([
            {"id": u64::MAX, "text": "知らない台詞", "filename": "v001_00_0001"}
        ]))
        .unwrap();
        let remakes = RemakeCorpus::from_table(&table, &FilterConfig::default());
        let corpus = OriginalCorpus::from_records(vec![original("0940010001V", "行くぞ")], None);
        let pipeline = AlignmentPipeline::new(MatcherConfig::default(), corpus, None);
        let alignment = pipeline.run(&remakes.utterances).unwrap();

        let report = AlignmentReport::assemble(&alignment, &remakes, pipeline.index());
        assert_eq!(report.unmatched[0].remake_id, u64::MAX);
        assert!(analysis::context_report(&report, pipeline.index()).is_empty());
    }
}
