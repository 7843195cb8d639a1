//! XLIFF 1.2 <-> translation unit model.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::unit::{AltTrans, Note, PlaceholderTag, Run, TagRole, TranslationUnit, UnitId};
use crate::xml::{Document, NodeId, NodeKind};

pub const XLIFF_12_NS: &str = "urn:oasis:names:tc:xliff:document:1.2";
pub const TOOL_ID: &str = "xliff-core";
pub const TOOL_NAME: &str = "xliff-core";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub type UnitTable = HashMap<UnitId, TranslationUnit>;

/// Header data of the single `file` written by an extractor.
#[derive(Debug, Clone)]
pub struct FileMeta<'a> {
    pub original: &'a str,
    pub source_language: &'a str,
    pub target_language: Option<&'a str>,
    pub datatype: &'a str,
    pub skeleton: &'a str,
    pub encoding: &'a str,
}

pub fn build_document(meta: &FileMeta<'_>, units: &[TranslationUnit]) -> Document {
    let mut doc = Document::with_root("xliff");
    let root = doc.root();
    doc.set_attr(root, "version", "1.2");
    doc.set_attr(root, "xmlns", XLIFF_12_NS);
    doc.set_attr(root, "xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance");
    doc.set_attr(
        root,
        "xsi:schemaLocation",
        format!("{XLIFF_12_NS} xliff-core-1.2-transitional.xsd"),
    );

    let file = doc.append_element(root, "file");
    doc.set_attr(file, "original", meta.original);
    doc.set_attr(file, "source-language", meta.source_language);
    if let Some(t) = meta.target_language.filter(|t| !t.is_empty()) {
        doc.set_attr(file, "target-language", t);
    }
    doc.set_attr(file, "tool-id", TOOL_ID);
    doc.set_attr(file, "datatype", meta.datatype);

    let header = doc.append_element(file, "header");
    let skl = doc.append_element(header, "skl");
    let external = doc.append_element(skl, "external-file");
    doc.set_attr(external, "href", meta.skeleton);
    let tool = doc.append_element(header, "tool");
    doc.set_attr(tool, "tool-version", TOOL_VERSION);
    doc.set_attr(tool, "tool-id", TOOL_ID);
    doc.set_attr(tool, "tool-name", TOOL_NAME);
    doc.append_pi(file, "encoding", meta.encoding);

    let body = doc.append_element(file, "body");
    for unit in units {
        append_unit(&mut doc, body, unit);
    }
    doc.indent(root, 0, 2);
    doc
}

fn append_unit(doc: &mut Document, parent: NodeId, unit: &TranslationUnit) {
    let tu = doc.append_element(parent, "trans-unit");
    doc.set_attr(tu, "id", unit.id.to_string());
    if let Some(name) = &unit.resname {
        doc.set_attr(tu, "resname", name.as_str());
    }
    if unit.approved == Some(true) {
        doc.set_attr(tu, "approved", "yes");
    }
    if unit.preserve_space {
        doc.set_attr(tu, "xml:space", "preserve");
    }
    let source = doc.append_element(tu, "source");
    append_runs(doc, source, unit, &unit.source);
    if let Some(target) = &unit.target {
        let t = doc.append_element(tu, "target");
        append_runs(doc, t, unit, target);
    }
    for note in &unit.notes {
        let n = doc.append_element(tu, "note");
        if let Some(id) = &note.id {
            doc.set_attr(n, "id", id.as_str());
        }
        if let Some(a) = &note.annotates {
            doc.set_attr(n, "annotates", a.as_str());
        }
        doc.append_text(n, &note.text);
    }
}

fn append_runs(doc: &mut Document, parent: NodeId, unit: &TranslationUnit, runs: &[Run]) {
    for run in runs {
        match run {
            Run::Text(t) => {
                doc.append_text(parent, t);
            }
            Run::Ph(id) => {
                let ph = doc.append_element(parent, "ph");
                doc.set_attr(ph, "id", id.as_str());
                if let Some(raw) = unit.raw_tag(id) {
                    doc.append_text(ph, raw);
                }
            }
            Run::Mrk {
                id,
                translate,
                text,
            } => {
                let mrk = doc.append_element(parent, "mrk");
                doc.set_attr(mrk, "mid", id.as_str());
                doc.set_attr(mrk, "mtype", if *translate { "term" } else { "protected" });
                doc.append_text(mrk, text);
            }
        }
    }
}

/// Every `trans-unit` with a numeric id, from all files and groups.
pub fn read_units(doc: &Document) -> UnitTable {
    let mut table = UnitTable::new();
    for file in doc.children_named(doc.root(), "file") {
        read_file_units(doc, file, &mut table);
    }
    table
}

/// Units of one `file` element only.
pub fn read_file_units(doc: &Document, file: NodeId, table: &mut UnitTable) {
    if let Some(body) = doc.child(file, "body") {
        collect_units(doc, body, table);
    }
}

fn collect_units(doc: &Document, node: NodeId, table: &mut UnitTable) {
    for child in doc.child_elements(node).collect::<Vec<_>>() {
        match doc.name(child) {
            "trans-unit" => {
                let raw_id = doc.attr_or_empty(child, "id");
                match raw_id.parse::<UnitId>() {
                    Ok(id) => {
                        table.insert(id, read_unit(doc, child, id));
                    }
                    Err(_) => debug!(id = raw_id, "skipping trans-unit with non-numeric id"),
                }
            }
            "group" => collect_units(doc, child, table),
            _ => {}
        }
    }
}

fn read_unit(doc: &Document, tu: NodeId, id: UnitId) -> TranslationUnit {
    let mut unit = TranslationUnit::new(id);
    unit.resname = doc.attr(tu, "resname").map(str::to_string);
    unit.approved = doc.attr(tu, "approved").map(|a| a == "yes");
    unit.preserve_space = doc.attr(tu, "xml:space") == Some("preserve");

    let mut tags = BTreeMap::new();
    if let Some(src) = doc.child(tu, "source") {
        unit.source = read_runs(doc, src, &mut tags);
    }
    if let Some(tgt) = doc.child(tu, "target") {
        unit.target = Some(read_runs(doc, tgt, &mut tags));
    }
    unit.tags = tags;

    unit.notes = doc
        .children_named(tu, "note")
        .into_iter()
        .map(|n| Note {
            id: doc.attr(n, "id").map(str::to_string),
            annotates: doc.attr(n, "annotates").map(str::to_string),
            text: doc.text(n),
        })
        .collect();

    unit.matches = doc
        .children_named(tu, "alt-trans")
        .into_iter()
        .map(|alt| {
            let mut scratch = BTreeMap::new();
            AltTrans {
                match_quality: doc
                    .attr(alt, "match-quality")
                    .and_then(|q| q.trim_end_matches('%').parse().ok()),
                origin: doc.attr(alt, "origin").unwrap_or("unknown").to_string(),
                source: doc
                    .child(alt, "source")
                    .map(|s| read_runs(doc, s, &mut scratch))
                    .unwrap_or_default(),
                target: doc
                    .child(alt, "target")
                    .map(|t| read_runs(doc, t, &mut scratch))
                    .unwrap_or_default(),
            }
        })
        .collect();
    unit
}

fn read_runs(doc: &Document, node: NodeId, tags: &mut BTreeMap<String, PlaceholderTag>) -> Vec<Run> {
    let mut runs = Vec::new();
    for &c in doc.children(node) {
        match doc.kind(c) {
            NodeKind::Text(t) | NodeKind::CData(t) => push_text(&mut runs, t),
            NodeKind::Element(_) => match doc.name(c) {
                "ph" => {
                    let id = doc.attr_or_empty(c, "id").to_string();
                    tags.entry(id.clone()).or_insert_with(|| PlaceholderTag {
                        id: id.clone(),
                        raw_text: doc.text(c),
                        role: TagRole::Ph,
                    });
                    runs.push(Run::Ph(id));
                }
                "mrk" => {
                    let id = doc.attr_or_empty(c, "mid").to_string();
                    let translate = doc.attr(c, "mtype") != Some("protected");
                    let text = doc.text(c);
                    tags.entry(id.clone()).or_insert_with(|| PlaceholderTag {
                        id: id.clone(),
                        raw_text: text.clone(),
                        role: TagRole::Mrk { translate },
                    });
                    runs.push(Run::Mrk {
                        id,
                        translate,
                        text,
                    });
                }
                _ => push_text(&mut runs, &doc.text(c)),
            },
            _ => {}
        }
    }
    runs
}

fn push_text(runs: &mut Vec<Run>, text: &str) {
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(Run::Text(prev)) => prev.push_str(text),
        _ => runs.push(Run::Text(text.to_string())),
    }
}

/// `href` of the first `skl/external-file` in a file header.
pub fn skeleton_href(doc: &Document, file: NodeId) -> Option<String> {
    let skl = doc.child(doc.child(file, "header")?, "skl")?;
    let external = doc.child(skl, "external-file")?;
    doc.attr(external, "href").map(str::to_string)
}

pub fn has_internal_skeleton(doc: &Document, file: NodeId) -> bool {
    doc.child(file, "header")
        .and_then(|h| doc.child(h, "skl"))
        .and_then(|s| doc.child(s, "internal-file"))
        .is_some()
}
