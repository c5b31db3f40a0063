pub mod context;

use std::path::Path;
use std::fs;
use ahash::{AHashMap, AHashSet};
use log::{info, debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::config::file::FileConfig;
use crate::config::subsystems::FilterConfig;
use crate::error::{Error, Result};
use crate::parser::classify::classify_stem;
use crate::types::{
    Context, OriginalId, OriginalUtterance, RemakeId, RemakeUtterance, ScenePosition,
    SkippedRecord,
};
use self::context::{annotate_sorted, same_scene, sort_and_annotate, ungrouped};

/// Shape of the remake voice table on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// `{"data": [{"data": [...]}]}` as written by the game's table tools.
    Nested,
    Flat,
}

/// The remake voice table, kept as JSON so the same document can be written
/// back with updated filenames.
#[derive(Debug, Clone)]
pub struct RemakeTable {
    pub document: Value,
    pub layout: TableLayout,
}

impl RemakeTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
        Self::from_document(document)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))
    }

    pub fn from_document(document: Value) -> Result<Self> {
        let layout = if document.is_array() {
            TableLayout::Flat
        } else if document
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("data"))
            .map(Value::is_array)
            .unwrap_or(false)
        {
            TableLayout::Nested
        } else {
            return Err(Error::config(
                "remake table is neither a flat array nor a data[0].data container",
            ));
        };
        Ok(Self { document, layout })
    }

    pub fn entries(&self) -> &[Value] {
        let array = match self.layout {
            TableLayout::Flat => self.document.as_array(),
            TableLayout::Nested => self.document["data"][0]["data"].as_array(),
        };
        array.map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self.layout {
            TableLayout::Flat => self.document.as_array_mut(),
            TableLayout::Nested => self.document["data"][0]["data"].as_array_mut(),
        }
    }
}

/// Remake lines split into the aligned set and the ones kept out of it.
#[derive(Debug, Clone, Default)]
pub struct RemakeCorpus {
    /// Sorted by id, context annotated across the whole table.
    pub utterances: Vec<RemakeUtterance>,
    pub skipped: Vec<SkippedRecord>,
}

pub(crate) fn id_from_value(value: &Value) -> Option<RemakeId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RemakeCorpus {
    /// Validates every table entry, annotates context over all valid lines in
    /// id order, then applies the classification filter.
    pub fn from_table(table: &RemakeTable, filter: &FilterConfig) -> Self {
        let mut skipped = Vec::new();
        let mut seen: AHashSet<RemakeId> = AHashSet::new();
        let mut valid = Vec::new();

        for entry in table.entries() {
            let id = entry.get("id").and_then(id_from_value);
            let text = entry.get("text").and_then(Value::as_str).map(str::trim);
            let filename = entry.get("filename").and_then(string_from_value);

            let reason = match (id, text, &filename) {
                (None, _, _) => Some("missing or non-numeric id"),
                (_, None, _) | (_, Some(""), _) => Some("missing or empty text"),
                (_, _, None) => Some("missing filename"),
                (Some(id), _, _) if !seen.insert(id) => Some("duplicate id"),
                _ => None,
            };
            if let Some(reason) = reason {
                debug!("Skipping remake entry {:?}: {}", id, reason);
                skipped.push(SkippedRecord {
                    remake_id: id,
                    filename: filename.clone(),
                    text: text.map(str::to_string),
                    reason: reason.to_string(),
                });
                continue;
            }

            // All three are present past the guard above
            if let (Some(id), Some(text), Some(filename)) = (id, text, filename) {
                valid.push(RemakeUtterance {
                    id,
                    text: text.to_string(),
                    classification: classify_stem(&filename),
                    filename,
                    context: Context::default(),
                });
            }
        }

        sort_and_annotate(&mut valid, |a, b| a.id.cmp(&b.id), ungrouped::<RemakeUtterance>);

        let mut utterances = Vec::with_capacity(valid.len());
        for utterance in valid {
            match filter.rejection_reason(&utterance.classification) {
                None => utterances.push(utterance),
                Some(reason) => {
                    debug!("Skipping {}: {}", utterance.filename, reason);
                    skipped.push(SkippedRecord {
                        remake_id: Some(utterance.id),
                        filename: Some(utterance.filename),
                        text: Some(utterance.text),
                        reason,
                    });
                }
            }
        }

        info!(
            "Remake table: {} lines to align, {} skipped",
            utterances.len(),
            skipped.len()
        );
        Self { utterances, skipped }
    }
}

#[derive(Debug, Deserialize)]
struct RawOriginalEntry {
    #[serde(default)]
    voice_id: Option<Value>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    character_id: Option<Value>,
    #[serde(default)]
    script_id: Option<Value>,
    #[serde(default)]
    source_file: Option<String>,
}

impl RawOriginalEntry {
    fn into_utterance(self) -> std::result::Result<OriginalUtterance, String> {
        let voice_id = self
            .voice_id
            .as_ref()
            .and_then(string_from_value)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "missing voice_id".to_string())?;
        let text = self
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| format!("{}: missing or empty text", voice_id))?;
        Ok(OriginalUtterance {
            scene: ScenePosition::from_voice_id(&voice_id),
            id: OriginalId::new(voice_id),
            text,
            character_id: self.character_id.as_ref().and_then(string_from_value),
            script_id: self
                .script_id
                .as_ref()
                .and_then(string_from_value)
                .filter(|s| !s.is_empty()),
            source_file: self.source_file,
            context: Context::default(),
        })
    }
}

/// The legacy corpus in its two orders.
#[derive(Debug, Clone, Default)]
pub struct OriginalCorpus {
    /// Voice lines sorted by (scene, sequence), context scoped to the scene.
    pub voices: Vec<OriginalUtterance>,
    /// Script lines sorted by script id, context across the whole script.
    pub script: Vec<OriginalUtterance>,
    /// Reasons for records dropped during loading.
    pub rejected: Vec<String>,
}

fn read_original_file(path: &Path) -> Result<Vec<RawOriginalEntry>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::load(path.display().to_string(), e.to_string()))
}

fn script_order(a: &OriginalUtterance, b: &OriginalUtterance) -> std::cmp::Ordering {
    let key = |o: &OriginalUtterance| {
        let script = o.script_id.as_deref().unwrap_or("");
        (script.parse::<u64>().ok(), script.to_string())
    };
    key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id))
}

fn voice_order(a: &OriginalUtterance, b: &OriginalUtterance) -> std::cmp::Ordering {
    a.scene.cmp(&b.scene).then_with(|| a.id.cmp(&b.id))
}

impl OriginalCorpus {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(voice_file: P, script_file: Option<Q>) -> Result<Self> {
        let voices = read_original_file(voice_file.as_ref())?;
        let script = match script_file {
            Some(path) => Some(read_original_file(path.as_ref())?),
            None => None,
        };
        Ok(Self::from_raw(voices, script))
    }

    /// Loads the files named in `[file]`. The voice file is reused in script
    /// order only when no script file is configured; a configured file that
    /// cannot be read is a load error.
    pub fn from_files(files: &FileConfig) -> Result<Self> {
        if files.original_script_file.is_none() {
            info!("No script file configured, reusing the voice file in script order");
        }
        Self::load(&files.original_voice_file, files.original_script_file.as_ref())
    }

    /// Builds both orders from already loaded records. Without a script dump
    /// the voice lines are reused in script order.
    pub fn from_records(voices: Vec<OriginalUtterance>, script: Option<Vec<OriginalUtterance>>) -> Self {
        let mut by_voice: AHashMap<OriginalId, OriginalUtterance> = AHashMap::new();
        for record in voices {
            // Later duplicates win
            by_voice.insert(record.id.clone(), record);
        }
        let mut voices: Vec<OriginalUtterance> = by_voice.into_values().collect();
        sort_and_annotate(&mut voices, voice_order, same_scene);

        let mut script = match script {
            Some(records) => {
                let mut by_script: AHashMap<String, OriginalUtterance> = AHashMap::new();
                for record in records {
                    let key = record
                        .script_id
                        .clone()
                        .unwrap_or_else(|| format!("voice:{}", record.id));
                    by_script.insert(key, record);
                }
                by_script.into_values().collect()
            },
            None => voices.clone(),
        };
        script.sort_by(script_order);
        annotate_sorted(&mut script, ungrouped::<OriginalUtterance>);

        Self {
            voices,
            script,
            rejected: Vec::new(),
        }
    }

    fn from_raw(voices: Vec<RawOriginalEntry>, script: Option<Vec<RawOriginalEntry>>) -> Self {
        let mut rejected = Vec::new();
        let mut convert = |raw: Vec<RawOriginalEntry>, source: &str| -> Vec<OriginalUtterance> {
            raw.into_iter()
                .filter_map(|entry| match entry.into_utterance() {
                    Ok(utterance) => Some(utterance),
                    Err(reason) => {
                        warn!("Dropping {} record: {}", source, reason);
                        rejected.push(format!("{}: {}", source, reason));
                        None
                    }
                })
                .collect()
        };
        let voices = convert(voices, "voice");
        let script = script.map(|raw| convert(raw, "script"));

        let mut corpus = Self::from_records(voices, script);
        info!(
            "Original corpus: {} voice lines, {} script lines, {} rejected",
            corpus.voices.len(),
            corpus.script.len(),
            rejected.len()
        );
        corpus.rejected = rejected;
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_table_is_validated_and_filtered() {
        let document = json!({"data": [{"data": [
            {"id": 3, "text": "three", "filename": "v001_00_0003"},
            {"id": 1, "text": "one", "filename": "v001_00_0001"},
            {"id": 2, "text": "two", "filename": "v001_av_0002"},
            {"id": 4, "text": "", "filename": "v001_00_0004"},
            {"text": "no id", "filename": "v001_00_0005"},
            {"id": 1, "text": "again", "filename": "v001_00_0006"}
        ]}]});
        let table = RemakeTable::from_document(document).unwrap();
        assert_eq!(table.layout, TableLayout::Nested);

        let corpus = RemakeCorpus::from_table(&table, &FilterConfig::default());
        let ids: Vec<RemakeId> = corpus.utterances.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
        // Context is computed before filtering, so the skipped line 2 still
        // shows up as a neighbour.
        assert_eq!(corpus.utterances[0].context.next, "two");
        assert_eq!(corpus.utterances[1].context.prev, "two");

        let reasons: Vec<&str> = corpus.skipped.iter().map(|s| s.reason.as_str()).collect();
        assert!(reasons.contains(&"missing or empty text"));
        assert!(reasons.contains(&"missing or non-numeric id"));
        assert!(reasons.contains(&"duplicate id"));
        assert!(reasons.iter().any(|r| r.contains("active_voice")));
    }

    #[test]
    fn unsupported_table_shape_is_rejected() {
        assert!(RemakeTable::from_document(json!({"rows": []})).is_err());
    }

    #[test]
    fn originals_are_deduplicated_and_ordered() {
        let voices = vec![
            RawOriginalEntry {
                voice_id: Some(json!("0000020001V")),
                text: Some("scene two".into()),
                character_id: Some(json!(7)),
                script_id: Some(json!("3")),
                source_file: None,
            },
            RawOriginalEntry {
                voice_id: Some(json!("0000010001V")),
                text: Some("first".into()),
                character_id: None,
                script_id: Some(json!("1")),
                source_file: None,
            },
            RawOriginalEntry {
                voice_id: Some(json!("0000010001V")),
                text: Some("first, revised".into()),
                character_id: None,
                script_id: Some(json!("1")),
                source_file: None,
            },
            RawOriginalEntry {
                voice_id: Some(json!("0010010002V")),
                text: Some("second".into()),
                character_id: None,
                script_id: Some(json!("2")),
                source_file: None,
            },
            RawOriginalEntry {
                voice_id: None,
                text: Some("orphan".into()),
                character_id: None,
                script_id: None,
                source_file: None,
            },
        ];
        let corpus = OriginalCorpus::from_raw(voices, None);
        assert_eq!(corpus.rejected.len(), 1);

        let texts: Vec<&str> = corpus.voices.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["first, revised", "second", "scene two"]);
        assert_eq!(corpus.voices[1].context.prev, "first, revised");
        assert_eq!(corpus.voices[1].context.next, "");
        assert_eq!(corpus.voices[2].character_id.as_deref(), Some("7"));

        let script: Vec<&str> = corpus.script.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(script, vec!["first, revised", "second", "scene two"]);
        assert_eq!(corpus.script[1].context.next, "scene two");
    }

    #[test]
    fn missing_corpus_file_names_the_artifact() {
        let err = OriginalCorpus::load("does/not/exist.json", None::<&str>).unwrap_err();
        match err {
            Error::Load { artifact, .. } => assert!(artifact.contains("exist.json")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn configured_script_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let voice_file = dir.path().join("voice_data.json");
        fs::write(&voice_file, r#"[{"voice_id": "0000010001V", "text": "first"}]"#).unwrap();

        let mut files = FileConfig::default();
        files.original_voice_file = voice_file;
        files.original_script_file = Some(dir.path().join("script_data.json"));
        match OriginalCorpus::from_files(&files).unwrap_err() {
            Error::Load { artifact, .. } => assert!(artifact.contains("script_data.json")),
            other => panic!("unexpected error {:?}", other),
        }

        files.original_script_file = None;
        let corpus = OriginalCorpus::from_files(&files).unwrap();
        assert_eq!(corpus.script.len(), 1);
        assert_eq!(corpus.script[0].text, "first");
    }
}
