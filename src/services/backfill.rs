//! Skeleton backfill: put translated units back where their markers are.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::model::params::BackfillParams;
use crate::model::unit::{Run, TranslationUnit, UnitId};
use crate::services::xliff::{self, UnitTable};
use crate::services::{encoding, store};
use crate::xml::{Document, NodeId, NodeKind};

static WHOLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%%(\d+)%%%$").expect("marker pattern is valid"));

static ANY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%%%(\d+)%%%").expect("marker pattern is valid"));

/// Subtrees with this name hold revision history and are never backfilled.
const REVISIONS: &str = "revisions";

#[derive(Debug, Serialize)]
pub struct BackfillReport {
    pub replaced: usize,
    pub output: PathBuf,
}

/// Replace every element whose only content is a marker with its unit content.
pub fn backfill_xml(skeleton: &mut Document, units: &UnitTable) -> Result<usize> {
    let mut replaced = 0;
    let root = skeleton.root();
    replace_markers(skeleton, root, units, &mut replaced)?;
    Ok(replaced)
}

fn replace_markers(doc: &mut Document, node: NodeId, units: &UnitTable, replaced: &mut usize) -> Result<()> {
    if doc.local_name(node) == REVISIONS {
        return Ok(());
    }
    if let Some(id) = marker_id(doc, node) {
        let unit = units.get(&id).ok_or(ConvertError::UnresolvedUnit(id))?;
        fill(doc, node, unit)?;
        *replaced += 1;
        return Ok(());
    }
    for child in doc.child_elements(node).collect::<Vec<_>>() {
        replace_markers(doc, child, units, replaced)?;
    }
    Ok(())
}

fn marker_id(doc: &Document, node: NodeId) -> Option<UnitId> {
    match doc.children(node) {
        [only] => match doc.kind(*only) {
            NodeKind::Text(t) => WHOLE_MARKER.captures(t)?.get(1)?.as_str().parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

fn fill(doc: &mut Document, node: NodeId, unit: &TranslationUnit) -> Result<()> {
    doc.clear_children(node);
    for run in unit.effective_runs() {
        match run {
            Run::Text(t) => {
                doc.append_text(node, &strip_line_breaks(t));
            }
            Run::Ph(id) => {
                let raw = strip_line_breaks(unit.raw_tag(id).unwrap_or_default());
                if raw.is_empty() {
                    continue;
                }
                doc.import_fragment(node, &raw).map_err(|e| {
                    ConvertError::structural(format!(
                        "unit {}: placeholder {id} is not a well-formed element: {e}",
                        unit.id
                    ))
                })?;
            }
            Run::Mrk { text, .. } => {
                doc.append_text(node, &strip_line_breaks(text));
            }
        }
    }
    Ok(())
}

fn strip_line_breaks(text: &str) -> String {
    text.replace(['\r', '\n'], "")
}

/// Replace markers inside every string leaf of a JSON skeleton.
pub fn backfill_json(skeleton: &mut Value, units: &UnitTable) -> Result<usize> {
    let mut replaced = 0;
    visit_json(skeleton, units, &mut replaced)?;
    Ok(replaced)
}

fn visit_json(value: &mut Value, units: &UnitTable, replaced: &mut usize) -> Result<()> {
    match value {
        Value::String(text) => {
            if ANY_MARKER.is_match(text) {
                *text = substitute(text, units, replaced)?;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                visit_json(item, units, replaced)?;
            }
        }
        Value::Object(map) => {
            for (_, child) in map.iter_mut() {
                visit_json(child, units, replaced)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn substitute(text: &str, units: &UnitTable, replaced: &mut usize) -> Result<String> {
    let mut missing: Option<UnitId> = None;
    let out = ANY_MARKER.replace_all(text, |caps: &Captures<'_>| {
        let unit = caps[1].parse::<UnitId>().ok().and_then(|id| units.get(&id));
        match unit {
            Some(u) => {
                *replaced += 1;
                u.render(u.effective_runs())
            }
            None => {
                missing.get_or_insert_with(|| caps[1].parse().unwrap_or(UnitId::MAX));
                String::new()
            }
        }
    });
    match missing {
        Some(id) => Err(ConvertError::UnresolvedUnit(id)),
        None => Ok(out.into_owned()),
    }
}

/// Skeleton, units and output encoding of the first `file` in an XLIFF.
struct Loaded {
    skeleton: PathBuf,
    units: UnitTable,
    encoding: String,
}

fn load(params: &BackfillParams) -> Result<Loaded> {
    let xliff_path = Path::new(&params.xliff);
    let doc = store::read_document(xliff_path)?;
    let file = doc
        .child(doc.root(), "file")
        .ok_or_else(|| ConvertError::structural("XLIFF document has no <file>"))?;

    let skeleton = match params.skeleton.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => PathBuf::from(s),
        None => skeleton_path(&doc, file, xliff_path)?,
    };

    let encoding = params
        .encoding
        .clone()
        .filter(|e| !e.is_empty())
        .or_else(|| recorded_encoding(&doc, file))
        .unwrap_or_else(|| "UTF-8".to_string());

    Ok(Loaded {
        skeleton,
        units: xliff::read_units(&doc),
        encoding,
    })
}

/// Skeleton location from the file header, resolved against the XLIFF's directory.
pub fn skeleton_path(doc: &Document, file: NodeId, xliff_path: &Path) -> Result<PathBuf> {
    if xliff::has_internal_skeleton(doc, file) {
        return Err(ConvertError::structural(
            "embedded skeletons are not supported, extract it and pass its path",
        ));
    }
    let href = xliff::skeleton_href(doc, file)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConvertError::structural("file header has no skeleton reference"))?;
    let href = Path::new(&href);
    if href.is_absolute() {
        return Ok(href.to_path_buf());
    }
    let base = xliff_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(base.join(href))
}

/// Encoding recorded by the extractor in an `<?encoding ..?>` instruction.
pub fn recorded_encoding(doc: &Document, file: NodeId) -> Option<String> {
    doc.pis(file, "encoding")
        .first()
        .map(|(_, data)| data.trim().to_string())
        .filter(|e| !e.is_empty())
}

pub fn backfill_xml_file(params: &BackfillParams) -> Result<BackfillReport> {
    let loaded = load(params)?;
    info!(skeleton = %loaded.skeleton.display(), units = loaded.units.len(), "backfilling XML skeleton");

    let mut doc = store::read_document(&loaded.skeleton)?;
    let replaced = backfill_xml(&mut doc, &loaded.units)?;
    let output = PathBuf::from(&params.output);
    store::write_document(&output, &mut doc, &loaded.encoding)?;

    info!(replaced, output = %output.display(), "backfill finished");
    Ok(BackfillReport { replaced, output })
}

pub fn backfill_json_file(params: &BackfillParams) -> Result<BackfillReport> {
    let loaded = load(params)?;
    info!(skeleton = %loaded.skeleton.display(), units = loaded.units.len(), "backfilling JSON skeleton");

    let text = store::read_text(&loaded.skeleton, "UTF-8")?;
    let mut value: Value = serde_json::from_str(&text)?;
    let replaced = backfill_json(&mut value, &loaded.units)?;
    debug!(replaced, "markers replaced");

    let rendered = serde_json::to_string_pretty(&value)?;
    let bytes = encoding::encode(&rendered, &loaded.encoding)?;
    let output = PathBuf::from(&params.output);
    store::write_atomic(&output, &bytes)?;

    info!(replaced, output = %output.display(), "backfill finished");
    Ok(BackfillReport { replaced, output })
}
