//! DITA backfill and the cleanup pass applied to merged topics and maps.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::services::backfill::{self, backfill_xml};
use crate::services::xliff::{self, UnitTable};
use crate::services::store;
use crate::xml::{Document, NodeId};

const GUID_PREFIX: &str = "GUID-";

#[derive(Debug, Serialize)]
pub struct DitaReport {
    pub files: Vec<PathBuf>,
    pub replaced: usize,
}

/// Backfill every `file` of `xliff` and write the cleaned results under `output_dir`.
pub fn backfill_dita(xliff_path: &Path, output_dir: &Path, encoding: Option<&str>) -> Result<DitaReport> {
    let doc = store::read_document(xliff_path)?;
    let files = doc.children_named(doc.root(), "file");
    if files.is_empty() {
        return Err(ConvertError::structural("XLIFF document has no <file>"));
    }
    info!(files = files.len(), xliff = %xliff_path.display(), "merging DITA files");

    let mut report = DitaReport {
        files: Vec::with_capacity(files.len()),
        replaced: 0,
    };
    for file in files {
        let skeleton = backfill::skeleton_path(&doc, file, xliff_path)?;
        let mut units = UnitTable::new();
        xliff::read_file_units(&doc, file, &mut units);

        let mut topic = store::read_document(&skeleton)?;
        report.replaced += backfill_xml(&mut topic, &units)?;

        let lang = doc
            .attr(file, "target-language")
            .filter(|l| !l.is_empty())
            .or_else(|| doc.attr(file, "source-language"))
            .unwrap_or_default();
        clean_document(&mut topic, lang);

        let output = output_dir.join(output_name(doc.attr_or_empty(file, "original")));
        let label = encoding
            .map(str::to_string)
            .or_else(|| backfill::recorded_encoding(&doc, file))
            .unwrap_or_else(|| "UTF-8".to_string());
        store::write_document(&output, &mut topic, &label)?;
        debug!(output = %output.display(), "DITA file written");
        report.files.push(output);
    }
    info!(files = report.files.len(), replaced = report.replaced, "DITA merge finished");
    Ok(report)
}

/// Output location for a file's `original`: relative paths keep their
/// directories, anything else keeps only its file name.
fn output_name(original: &str) -> PathBuf {
    let path = Path::new(original);
    let relative_safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if relative_safe && !original.is_empty() {
        return path.to_path_buf();
    }
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output.dita"))
}

/// The post-merge cleanup of one topic or map.
pub fn clean_document(doc: &mut Document, lang: &str) {
    let root = doc.root();
    let ish = !doc.pis(doc.document_node(), "ish").is_empty() || !doc.pis(root, "ish").is_empty();
    if ish || doc.attr_or_empty(root, "id").starts_with(GUID_PREFIX) {
        restore_guid(doc, root);
    }
    clean_attributes(doc, root);
    if !lang.is_empty() {
        doc.set_attr(root, "xml:lang", lang);
    }
    doc.indent(root, 0, 2);
    clean_conref(doc, root);
}

/// `...GUID-1234=567...` becomes `GUID-1234`.
pub fn restore_guid_href(href: &str) -> Option<String> {
    let start = href.find("GUID")?;
    let end = start + 1 + href[start + 1..].find('=')?;
    Some(href[start..end].to_string())
}

/// `GUID-1234=567#frag` becomes `GUID-1234#frag`.
pub fn restore_guid_conref(conref: &str) -> Option<String> {
    if !conref.starts_with(GUID_PREFIX) {
        return None;
    }
    let end = conref.find('=')?;
    let guid = &conref[..end];
    Some(match conref.find('#') {
        Some(hash) => format!("{guid}{}", &conref[hash..]),
        None => guid.to_string(),
    })
}

pub fn restore_guid(doc: &mut Document, node: NodeId) {
    if let Some(href) = doc.attr(node, "href").and_then(restore_guid_href) {
        doc.set_attr(node, "href", href);
    }
    if let Some(conref) = doc.attr(node, "conref").and_then(restore_guid_conref) {
        doc.set_attr(node, "conref", conref);
    }
    for child in doc.child_elements(node).collect::<Vec<_>>() {
        restore_guid(doc, child);
    }
}

pub fn clean_attributes(doc: &mut Document, node: NodeId) {
    let class = doc.attr_or_empty(node, "class");
    if class.starts_with("- ") || class.starts_with("+ ") {
        doc.remove_attr(node, "class");
    }
    doc.remove_attr(node, "xmlns:ditaarch");
    doc.remove_attr(node, "ditaarch:DITAArchVersion");
    doc.remove_attr(node, "domains");
    if doc.attr(node, "status") == Some("removeContent") {
        doc.clear_children(node);
        doc.remove_attr(node, "status");
    }
    for child in doc.child_elements(node).collect::<Vec<_>>() {
        clean_attributes(doc, child);
    }
}

pub fn clean_conref(doc: &mut Document, node: NodeId) {
    doc.remove_attr(node, "fluentaIgnore");
    let unresolved = doc.attr(node, "conaction").map_or(true, str::is_empty)
        && (has_value(doc, node, "conref") || has_value(doc, node, "conkeyref"));
    if unresolved {
        empty_element(doc, node);
    }
    for child in doc.child_elements(node).collect::<Vec<_>>() {
        clean_conref(doc, child);
    }
}

fn has_value(doc: &Document, node: NodeId, name: &str) -> bool {
    doc.attr(node, name).map_or(false, |v| !v.is_empty())
}

/// Drop all text below `node`, keeping the element skeleton.
pub fn empty_element(doc: &mut Document, node: NodeId) {
    let elements: Vec<NodeId> = doc.child_elements(node).collect();
    if elements.is_empty() {
        doc.clear_children(node);
        return;
    }
    for &child in &elements {
        empty_element(doc, child);
    }
    doc.set_children(node, elements);
}
