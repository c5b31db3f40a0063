use std::fs;
use std::path::Path;
use serde_json::{json, Value};

use voicemap::config::subsystems::MatcherConfig;
use voicemap::corpus::{OriginalCorpus, RemakeCorpus, RemakeTable};
use voicemap::output::renamer::ClipRenamer;
use voicemap::{AlignmentPipeline, AlignmentReport, ArtifactWriter, VoicemapConfig};

fn write_inputs(dir: &Path) {
    let table = json!({"data": [{"data": [
        {"id": 1, "text": "A", "filename": "v001_00_0001"},
        {"id": 2, "text": "B", "filename": "v001_00_0002"},
        {"id": 3, "text": "y", "filename": "v001_00_0003"},
        {"id": 4, "text": "D", "filename": "v001_00_0004"},
        {"id": 5, "text": "E", "filename": "v001_00_0005"},
        {"id": 6, "text": "F", "filename": "v002_00_0006"},
        {"id": 7, "text": "戦闘", "filename": "v001_b0001"}
    ]}]});
    let voices = json!([
        {"voice_id": "0940010001V", "text": "A", "character_id": "094", "source_file": "ev0001.bin"},
        {"voice_id": "0940010002V", "text": "B", "character_id": "094", "source_file": "ev0001.bin"},
        {"voice_id": "0940010003V", "text": "C", "character_id": "094", "source_file": "ev0001.bin"},
        {"voice_id": "0940010004V", "text": "D", "character_id": "094", "source_file": "ev0001.bin"},
        {"voice_id": "0940010005V", "text": "E", "character_id": "094", "source_file": "ev0001.bin"},
        {"voice_id": "0120020001V", "text": "F", "character_id": "012", "source_file": "ev0002.bin"},
        {"text": "no id"}
    ]);
    fs::write(dir.join("t_voice.json"), table.to_string()).unwrap();
    fs::write(dir.join("voice_data.json"), voices.to_string()).unwrap();
}

/// Runs the whole flow into `output` with blockwise matching off, so the
/// line between B and D stays unmatched.
fn run_into(inputs: &Path, output: &Path) -> AlignmentReport {
    let config = VoicemapConfig::default();
    let table = RemakeTable::load(inputs.join("t_voice.json")).unwrap();
    let remakes = RemakeCorpus::from_table(&table, &config.filter);
    let corpus = OriginalCorpus::load(inputs.join("voice_data.json"), None::<&Path>).unwrap();
    assert_eq!(corpus.rejected.len(), 1);

    let matcher = MatcherConfig {
        use_blockwise: false,
        ..MatcherConfig::default()
    };
    let pipeline = AlignmentPipeline::new(matcher, corpus, None);
    let alignment = pipeline.run(&remakes.utterances).unwrap();
    let report = AlignmentReport::assemble(&alignment, &remakes, pipeline.index());

    let writer = ArtifactWriter::new(output, &config.output);
    writer.write_all(&report, &alignment.audit, &table, pipeline.index()).unwrap();
    report
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    write_inputs(dir.path());
    let report = run_into(dir.path(), &output);

    assert_eq!(report.matched.len(), 5);
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.skipped.len(), 1);

    for name in [
        "merged_voice_data.json",
        "unmatched_voice_data.json",
        "skipped_voice_data.json",
        "audit_log.json",
        "match_result.csv",
        "t_voice.json",
        "voice_id_mapping.csv",
        "context_analysis_report.json",
    ] {
        assert!(output.join(name).exists(), "{} missing", name);
    }
    let clip = hound::WavReader::open(output.join("voice").join("wav").join("EMPTY.wav")).unwrap();
    assert_eq!(clip.spec().channels, 1);

    let merged = read_json(&output.join("merged_voice_data.json"));
    assert_eq!(merged[0]["remake_id"], 1);
    assert_eq!(merged[0]["original_id"], "0940010001V");
    assert_eq!(merged[0]["source_file"], "ev0001.bin");
    assert_eq!(merged[0]["match_type"], "exact");

    let unmatched = read_json(&output.join("unmatched_voice_data.json"));
    assert_eq!(unmatched[0]["remake_id"], 3);

    let audit = read_json(&output.join("audit_log.json"));
    assert!(!audit.as_array().unwrap().is_empty());
}

#[test]
fn remake_table_points_at_legacy_clips() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    write_inputs(dir.path());
    run_into(dir.path(), &output);

    let table = read_json(&output.join("t_voice.json"));
    let entries = &table["data"][0]["data"];
    assert_eq!(entries[0]["filename"], "ch0940010001");
    assert_eq!(entries[2]["filename"], "EMPTY");
    assert_eq!(entries[5]["filename"], "ch0120020001");
    // Filtered lines keep their remake clip
    assert_eq!(entries[6]["filename"], "v001_b0001");
    assert_eq!(entries[6]["text"], "戦闘");
}

#[test]
fn tabular_exports_cover_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    write_inputs(dir.path());
    run_into(dir.path(), &output);

    let csv = fs::read_to_string(output.join("match_result.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 8);
    assert!(rows[0].starts_with("RemakeVoiceId,"));
    assert_eq!(rows[1], "1,v001_00_0001,001,A,ch0940010001,A,exact");
    assert!(rows[3].ends_with(",unmatched"));
    assert!(rows[7].ends_with(",skipped"));

    let mapping = fs::read_to_string(output.join("voice_id_mapping.csv")).unwrap();
    let mapping: Vec<&str> = mapping.lines().collect();
    assert_eq!(mapping, vec!["RemakeVoiceCharacterId,OldVoiceCharacterId", "001,094", "002,012"]);
}

#[test]
fn context_report_names_the_skipped_over_line() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    write_inputs(dir.path());
    run_into(dir.path(), &output);

    let report = read_json(&output.join("context_analysis_report.json"));
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["unmatched_remake_id"], 3);
    assert_eq!(entries[0]["inferred_original_id"], "0940010003V");
    assert_eq!(entries[0]["comparison"][1]["context"], "current_unmatched");
    assert_eq!(entries[0]["comparison"][1]["original_text"], "C");
}

#[test]
fn outputs_are_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    run_into(dir.path(), &first);
    run_into(dir.path(), &second);

    for name in ["merged_voice_data.json", "unmatched_voice_data.json", "match_result.csv", "t_voice.json"] {
        assert_eq!(
            fs::read(first.join(name)).unwrap(),
            fs::read(second.join(name)).unwrap(),
            "{} differs",
            name
        );
    }
}

#[test]
fn legacy_clips_are_copied_under_remake_names() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    write_inputs(dir.path());
    run_into(dir.path(), &output);

    let legacy = dir.path().join("legacy");
    fs::create_dir_all(&legacy).unwrap();
    // ch0940010005 is left out on purpose
    for clip in ["ch0940010001", "ch0940010002", "ch0940010004", "ch0120020001"] {
        fs::write(legacy.join(format!("{}.wav", clip)), clip).unwrap();
    }
    let csv_path = output.join("match_result.csv");

    let renamed = dir.path().join("renamed");
    let summary = ClipRenamer::new(&legacy, &renamed, &[]).copy_from_csv(&csv_path).unwrap();
    assert_eq!(summary.copied.len(), 4);
    assert_eq!(summary.missing, vec![legacy.join("ch0940010005.wav")]);
    // The unmatched line and the filtered battle line
    assert_eq!(summary.unmapped, 2);
    let copied = renamed.join("all").join("wav").join("v001_00_0001.wav");
    assert_eq!(fs::read_to_string(copied).unwrap(), "ch0940010001");
    assert!(!renamed.join("all").join("wav").join("v001_00_0005.wav").exists());

    let by_character = dir.path().join("by_character");
    let summary = ClipRenamer::new(&legacy, &by_character, &["2".to_string()])
        .copy_from_csv(&csv_path)
        .unwrap();
    assert_eq!(summary.copied, vec![by_character.join("002").join("wav").join("v002_00_0006.wav")]);
    assert_eq!(fs::read_to_string(&summary.copied[0]).unwrap(), "ch0120020001");
    assert!(!by_character.join("001").exists());
}

#[test]
fn missing_match_result_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let renamer = ClipRenamer::new(dir.path(), dir.path().join("out"), &[]);
    let err = renamer.copy_from_csv(dir.path().join("match_result.csv")).unwrap_err();
    assert!(matches!(err, voicemap::Error::Load { .. }));
}
