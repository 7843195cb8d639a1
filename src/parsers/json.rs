//! JSON source extraction.
//!
//! Every translatable string leaf is replaced in place by its unit marker; the
//! mutated value is the skeleton and the collected units go into an XLIFF 1.2
//! file whose header points at that skeleton.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::model::json_config::{FieldMapping, JsonConfig};
use crate::model::params::ExtractParams;
use crate::model::unit::TranslationUnit;
use crate::services::segment_builder::{SegmentBuilder, UnitExtras};
use crate::services::segmenter::Segmenter;
use crate::services::{encoding, store, xliff};

pub const DATATYPE: &str = "x-json";

#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub units: usize,
    pub xliff: PathBuf,
    pub skeleton: PathBuf,
}

#[derive(Debug)]
pub enum ExtractOutcome {
    Extracted(ExtractReport),
    NothingToTranslate,
}

pub struct JsonExtractor<'a> {
    builder: SegmentBuilder<'a>,
    config: Option<&'a JsonConfig>,
}

impl<'a> JsonExtractor<'a> {
    pub fn new(
        config: Option<&'a JsonConfig>,
        segmenter: Option<&'a dyn Segmenter>,
        language: &str,
    ) -> Self {
        JsonExtractor {
            builder: SegmentBuilder::new(segmenter).with_language(language),
            config,
        }
    }

    pub fn finish(self) -> Vec<TranslationUnit> {
        self.builder.finish().into_units()
    }

    pub fn visit(&mut self, value: &mut Value) -> Result<()> {
        match value {
            Value::String(text) => {
                if !text.trim().is_empty() {
                    *text = self.builder.add_text(text);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.visit(item)?;
                }
            }
            Value::Object(map) => self.visit_object(map)?,
            _ => {}
        }
        Ok(())
    }

    fn visit_object(&mut self, map: &mut Map<String, Value>) -> Result<()> {
        let mut consumed: HashSet<String> = HashSet::new();

        if let Some(config) = self.config {
            for mapping in &config.translatable {
                if self.visit_mapping(map, mapping)? {
                    consumed.insert(mapping.source_key.clone());
                    consumed.extend(mapping.target_key.iter().cloned());
                    consumed.extend(mapping.id_key.iter().cloned());
                    consumed.extend(mapping.note_key.iter().cloned());
                }
            }
        }

        for (key, child) in map.iter_mut() {
            if consumed.contains(key) {
                continue;
            }
            if self.config.map(|c| c.is_ignorable(key)).unwrap_or(false) {
                debug!(key = key.as_str(), "ignorable key skipped");
                continue;
            }
            self.visit(child)?;
        }
        Ok(())
    }

    /// Extract one configured field; false when the object lacks it.
    fn visit_mapping(&mut self, map: &mut Map<String, Value>, mapping: &FieldMapping) -> Result<bool> {
        let source = match map.get(&mapping.source_key) {
            Some(Value::String(s)) => s.clone(),
            _ => return Ok(false),
        };
        if source.trim().is_empty() {
            return Ok(true);
        }

        let target = string_field(map, mapping.target_key.as_deref());
        let resname = string_field(map, mapping.id_key.as_deref());
        let notes = mapping
            .note_key
            .as_deref()
            .and_then(|k| map.get(k))
            .map(note_texts)
            .unwrap_or_default();

        let marker = match self.builder.add_unit(
            &source,
            UnitExtras {
                target: target.as_deref(),
                resname: resname.as_deref(),
                notes,
            },
        )? {
            Some(marker) => marker,
            None => return Ok(true),
        };

        let slot = match mapping.target_key.as_deref() {
            Some(key) if map.contains_key(key) => key.to_string(),
            _ => mapping.source_key.clone(),
        };
        map.insert(slot, Value::String(marker));
        Ok(true)
    }
}

fn string_field(map: &Map<String, Value>, key: Option<&str>) -> Option<String> {
    key.and_then(|k| map.get(k))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn note_texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Walk `value` in place and return the units it produced.
pub fn extract_value(
    value: &mut Value,
    config: Option<&JsonConfig>,
    segmenter: Option<&dyn Segmenter>,
    language: &str,
) -> Result<Vec<TranslationUnit>> {
    if !(value.is_object() || value.is_array()) {
        return Err(ConvertError::UnsupportedFormat(
            "JSON root must be an object or an array".into(),
        ));
    }
    let mut extractor = JsonExtractor::new(config, segmenter, language);
    extractor.visit(value)?;
    Ok(extractor.finish())
}

pub fn load_source(path: &Path, label: &str) -> Result<Value> {
    let text = store::read_text(path, label)?;
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Err(ConvertError::UnsupportedFormat(path.display().to_string()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Extract a JSON file into a skeleton and an XLIFF 1.2 document.
///
/// Nothing is written when no translatable text is found.
pub fn extract_file(params: &ExtractParams, segmenter: &dyn Segmenter) -> Result<ExtractOutcome> {
    let source = Path::new(&params.source);
    encoding::encoding_for(&params.encoding)?;
    let config = params
        .config
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| JsonConfig::load(Path::new(c)))
        .transpose()?;

    info!(source = %source.display(), paragraph = params.paragraph, "extracting JSON");

    let mut value = load_source(source, &params.encoding)?;
    let segmenter = if params.paragraph { None } else { Some(segmenter) };
    let units = extract_value(&mut value, config.as_ref(), segmenter, &params.source_language)?;
    if units.is_empty() {
        info!(source = %source.display(), "nothing to translate");
        return Ok(ExtractOutcome::NothingToTranslate);
    }

    let skeleton = serde_json::to_string_pretty(&value)?;
    let doc = xliff::build_document(
        &xliff::FileMeta {
            original: &params.source,
            source_language: &params.source_language,
            target_language: params.target_language.as_deref(),
            datatype: DATATYPE,
            skeleton: &params.skeleton,
            encoding: &params.encoding,
        },
        &units,
    );
    let xliff_path = Path::new(&params.xliff);
    let skeleton_path = Path::new(&params.skeleton);
    store::write_pair(
        (skeleton_path, skeleton.as_bytes()),
        (xliff_path, doc.to_xml_string().as_bytes()),
    )?;

    info!(units = units.len(), xliff = %xliff_path.display(), "extraction finished");
    Ok(ExtractOutcome::Extracted(ExtractReport {
        units: units.len(),
        xliff: xliff_path.to_path_buf(),
        skeleton: skeleton_path.to_path_buf(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::unit::Run;
    use crate::services::segmenter::PunctuationSegmenter;
    use serde_json::json;

    #[test]
    fn string_leaves_become_markers() {
        let mut value = json!({"title": "Hello", "count": 3, "items": ["One", " ", "Two"]});
        let units = extract_value(&mut value, None, None, "en").unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(
            value,
            json!({"title": "%%%0%%%", "count": 3, "items": ["%%%1%%%", " ", "%%%2%%%"]})
        );
    }

    #[test]
    fn keys_keep_their_order() {
        let mut value = json!({"z": "last", "a": "first"});
        extract_value(&mut value, None, None, "en").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn scalar_root_is_unsupported() {
        let mut value = json!("text");
        assert!(matches!(
            extract_value(&mut value, None, None, "en"),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn sentence_mode_splits_leaves() {
        let mut value = json!({"p": "One. Two."});
        let units = extract_value(&mut value, None, Some(&PunctuationSegmenter), "en").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(value["p"], "%%%0%%%%%%1%%%");
    }

    fn config() -> JsonConfig {
        serde_json::from_value(json!({
            "translatable": [{"sourceKey": "en", "targetKey": "fr", "idKey": "key", "noteKey": "comment"}],
            "ignorable": ["meta"]
        }))
        .unwrap()
    }

    #[test]
    fn configured_fields_are_consumed() {
        let mut value = json!([
            {"key": "greeting", "en": "Hello", "fr": "Bonjour", "comment": "Home page", "meta": "skip me", "other": "Extra"}
        ]);
        let config = config();
        let units = extract_value(&mut value, Some(&config), None, "en").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].resname.as_deref(), Some("greeting"));
        assert_eq!(units[0].target, Some(vec![Run::Text("Bonjour".into())]));
        assert_eq!(units[0].notes[0].text, "Home page");
        assert_eq!(
            value,
            json!([{"key": "greeting", "en": "Hello", "fr": "%%%0%%%", "comment": "Home page", "meta": "skip me", "other": "%%%1%%%"}])
        );
    }

    #[test]
    fn marker_replaces_source_without_target_field() {
        let mut value = json!({"key": "k", "en": "Hello"});
        let config = config();
        extract_value(&mut value, Some(&config), None, "en").unwrap();
        assert_eq!(value, json!({"key": "k", "en": "%%%0%%%"}));
    }

    #[test]
    fn tag_only_field_stays_in_skeleton() {
        let mut value = json!({"key": "k", "en": "<b></b>", "fr": "<b></b>"});
        let config = config();
        let units = extract_value(&mut value, Some(&config), None, "en").unwrap();
        assert!(units.is_empty());
        assert_eq!(value, json!({"key": "k", "en": "<b></b>", "fr": "<b></b>"}));
    }

    #[test]
    fn bad_identifier_aborts_document() {
        let mut value = json!([{"key": "ok", "en": "A"}, {"key": "9 bad", "en": "B"}]);
        let config = config();
        assert!(matches!(
            extract_value(&mut value, Some(&config), None, "en"),
            Err(ConvertError::InvalidUnitId { .. })
        ));
    }

    #[test]
    fn empty_document_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.json");
        std::fs::write(&source, "{\"n\": 1, \"s\": \"  \"}").unwrap();
        let params = ExtractParams {
            source: source.display().to_string(),
            xliff: dir.path().join("a.xlf").display().to_string(),
            skeleton: dir.path().join("a.skl").display().to_string(),
            source_language: "en".into(),
            encoding: "UTF-8".into(),
            ..Default::default()
        };
        let outcome = extract_file(&params, &PunctuationSegmenter).unwrap();
        assert!(matches!(outcome, ExtractOutcome::NothingToTranslate));
        assert!(!dir.path().join("a.xlf").exists());
        assert!(!dir.path().join("a.skl").exists());
    }
}
