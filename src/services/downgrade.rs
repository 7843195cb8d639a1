//! XLIFF 2.x to XLIFF 1.2 conversion.
//!
//! The 2.x tree is walked once. Files, groups and units are rebuilt in the
//! flat 1.2 shape; every segment of a unit is folded into one joined
//! `source`/`target` pair.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConvertError, Result};
use crate::model::params::DowngradeParams;
use crate::services::store;
use crate::services::validation::{StructuralValidator, Validator};
use crate::services::xliff::XLIFF_12_NS;
use crate::xml::{Document, NodeId, NodeKind};

/// Padding used around the children of a space-preserving trans-unit.
const PRESERVE_CHILD_PAD: &str = "\n        ";
const PRESERVE_CLOSE_PAD: &str = "\n      ";

/// Element kinds of an XLIFF 2.x tree the converter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XliffKind {
    Xliff,
    File,
    Group,
    Unit,
    Segment,
    Ignorable,
    Other,
}

impl From<&str> for XliffKind {
    fn from(s: &str) -> Self {
        match s {
            "xliff" => XliffKind::Xliff,
            "file" => XliffKind::File,
            "group" => XliffKind::Group,
            "unit" => XliffKind::Unit,
            "segment" => XliffKind::Segment,
            "ignorable" => XliffKind::Ignorable,
            _ => XliffKind::Other,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DowngradeReport {
    pub files: usize,
    pub units: usize,
    pub valid: bool,
}

struct Downgrader<'a> {
    src: &'a Document,
    out: Document,
    source_language: String,
    target_language: String,
    files: usize,
    units: usize,
}

/// Convert a parsed XLIFF 2.x document into a new XLIFF 1.2 document.
pub fn downgrade(src: &Document) -> Result<Document> {
    downgrade_counted(src).map(|(doc, _, _)| doc)
}

fn downgrade_counted(src: &Document) -> Result<(Document, usize, usize)> {
    let root = src.root();
    let version = src.attr_or_empty(root, "version");
    if !version.starts_with("2.") {
        return Err(ConvertError::UnsupportedVersion(version.to_string()));
    }

    let out = Document::with_root("xliff");
    let out_root = out.root();
    let mut d = Downgrader {
        src,
        out,
        source_language: String::new(),
        target_language: String::new(),
        files: 0,
        units: 0,
    };
    d.recurse(root, out_root)?;
    d.out.indent(out_root, 0, 2);
    Ok((d.out, d.files, d.units))
}

impl Downgrader<'_> {
    fn recurse(&mut self, node: NodeId, target: NodeId) -> Result<()> {
        let mut target = target;
        match XliffKind::from(self.src.local_name(node)) {
            XliffKind::Xliff => self.root(node, target)?,
            XliffKind::File => target = self.file(node, target)?,
            XliffKind::Group => target = self.group(node, target),
            XliffKind::Unit => return self.unit(node, target),
            XliffKind::Segment | XliffKind::Ignorable => return Ok(()),
            XliffKind::Other => {}
        }
        for child in self.src.child_elements(node).collect::<Vec<_>>() {
            self.recurse(child, target)?;
        }
        Ok(())
    }

    fn root(&mut self, node: NodeId, target: NodeId) -> Result<()> {
        self.out.set_attr(target, "version", "1.2");
        self.out.set_attr(target, "xmlns", XLIFF_12_NS);
        self.source_language = self
            .src
            .attr(node, "srcLang")
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ConvertError::structural("<xliff> has no srcLang attribute"))?
            .to_string();
        self.target_language = self.src.attr_or_empty(node, "trgLang").to_string();

        if let Some((_, encoding)) = self.src.pis(node, "encoding").first() {
            if !encoding.eq_ignore_ascii_case("UTF-8") {
                self.out.append_pi(target, "encoding", encoding);
            }
        }
        Ok(())
    }

    /// Build `file/header/body` and return the body.
    fn file(&mut self, node: NodeId, target: NodeId) -> Result<NodeId> {
        self.files += 1;
        let src = self.src;
        let file = self.out.append_element(target, "file");
        self.out.set_attr(file, "original", src.attr_or_empty(node, "original"));
        self.out.set_attr(file, "source-language", self.source_language.clone());
        if !self.target_language.is_empty() {
            self.out.set_attr(file, "target-language", self.target_language.clone());
        }
        let header = self.out.append_element(file, "header");
        let body = self.out.append_element(file, "body");

        if let Some(skeleton) = src.child_local(node, "skeleton") {
            let skl = self.out.append_element(header, "skl");
            match src.attr(skeleton, "href").filter(|h| !h.is_empty()) {
                Some(href) => {
                    let external = self.out.append_element(skl, "external-file");
                    self.out.set_attr(external, "href", href);
                }
                None => {
                    let internal = self.out.append_element(skl, "internal-file");
                    self.out.import_children(internal, src, skeleton);
                }
            }
        }

        if let Some(metadata) = src.child_local(node, "metadata") {
            for group in src.children_local(metadata, "metaGroup") {
                self.file_metadata(group, file, header);
            }
        }
        Ok(body)
    }

    fn file_metadata(&mut self, group: NodeId, file: NodeId, header: NodeId) {
        let src = self.src;
        let category = src.attr_or_empty(group, "category");
        let metas = src.children_local(group, "meta");
        match category {
            "tool" => {
                let tool = self.out.append_element(header, "tool");
                for meta in metas {
                    self.out
                        .set_attr(tool, src.attr_or_empty(meta, "type"), src.text(meta));
                }
            }
            "PI" => {
                for meta in metas {
                    self.out
                        .append_pi(file, src.attr_or_empty(meta, "type"), &src.text(meta));
                }
            }
            "project-data" => {
                for meta in metas {
                    let attr = match src.attr_or_empty(meta, "type") {
                        "project-name" => "product-name",
                        "project-id" => "product-version",
                        "build-number" => "build-num",
                        other => {
                            debug!(meta_type = other, "project-data entry has no 1.2 counterpart");
                            continue;
                        }
                    };
                    self.out.set_attr(file, attr, src.text(meta));
                }
            }
            "format" => {
                if let Some(meta) = metas.first() {
                    self.out.set_attr(file, "datatype", src.text(*meta));
                }
            }
            _ => {
                warn!(category, "metadata category kept as prop-group");
                let props = self.out.append_element(header, "prop-group");
                self.out.set_attr(props, "name", category);
                for meta in metas {
                    let prop = self.out.append_element(props, "prop");
                    self.out.set_attr(prop, "prop-type", src.attr_or_empty(meta, "type"));
                    self.out.import_children(prop, src, meta);
                }
            }
        }
    }

    fn group(&mut self, node: NodeId, target: NodeId) -> NodeId {
        let src = self.src;
        let group = self.out.append_element(target, "group");
        self.out.set_attr(group, "id", src.attr_or_empty(node, "id"));
        let first = src
            .child_local(node, "metadata")
            .and_then(|m| src.child_local(m, "metaGroup"));
        if let Some(meta_group) = first {
            for meta in src.children_local(meta_group, "meta") {
                match src.attr_or_empty(meta, "type") {
                    "ts" => self.out.set_attr(group, "ts", src.text(meta)),
                    "space" if src.text(meta) == "keep" => {
                        self.out.set_attr(group, "xml:space", "preserve")
                    }
                    _ => {}
                }
            }
        }
        group
    }

    fn unit(&mut self, node: NodeId, target: NodeId) -> Result<()> {
        self.units += 1;
        let src = self.src;
        let unit_id = src.attr_or_empty(node, "id");
        let tu = self.out.append_element(target, "trans-unit");
        self.out.set_attr(tu, "id", unit_id);

        let mut tags: HashMap<&str, String> = HashMap::new();
        if let Some(original_data) = src.child_local(node, "originalData") {
            for data in src.children_local(original_data, "data") {
                tags.insert(src.attr_or_empty(data, "id"), src.text(data));
            }
        }

        let mut source_nodes = Vec::new();
        let mut target_nodes = Vec::new();
        let mut approved = false;
        let mut preserve = false;
        for child in src.child_elements(node) {
            let kind = XliffKind::from(src.local_name(child));
            if !matches!(kind, XliffKind::Segment | XliffKind::Ignorable) {
                continue;
            }
            let seg_source = src.child_local(child, "source").ok_or_else(|| {
                ConvertError::structural(format!("unit \"{unit_id}\" has a segment without <source>"))
            })?;
            if src.attr(seg_source, "xml:space") == Some("preserve") {
                preserve = true;
            }
            source_nodes.extend_from_slice(src.children(seg_source));
            if let Some(seg_target) = src.child_local(child, "target") {
                target_nodes.extend_from_slice(src.children(seg_target));
            }
            if kind == XliffKind::Segment && src.attr(child, "state") == Some("final") {
                approved = true;
            }
        }

        if approved {
            self.out.set_attr(tu, "approved", "yes");
        }
        if preserve {
            self.out.set_attr(tu, "xml:space", "preserve");
        }

        self.pad(tu, preserve);
        let source = self.out.append_element(tu, "source");
        self.inline(&source_nodes, source, &tags);

        if !target_nodes.is_empty() || approved {
            self.pad(tu, preserve);
            let tgt = self.out.append_element(tu, "target");
            self.inline(&target_nodes, tgt, &tags);
        }

        if let Some(notes) = src.child_local(node, "notes") {
            for note in src.children_local(notes, "note") {
                self.pad(tu, preserve);
                let n = self.out.append_element(tu, "note");
                if let Some(id) = src.attr(note, "id").filter(|v| !v.is_empty()) {
                    self.out.set_attr(n, "id", id);
                }
                if let Some(applies) = src.attr(note, "appliesTo").filter(|v| !v.is_empty()) {
                    self.out.set_attr(n, "annotates", applies);
                }
                self.out.append_text(n, &src.text(note));
            }
        }

        if let Some(matches) = src.child_local(node, "matches") {
            for m in src.children_local(matches, "match") {
                self.alt_trans(m, tu, unit_id, &tags, preserve)?;
            }
        }

        if preserve {
            self.out.append_text(tu, PRESERVE_CLOSE_PAD);
        }
        Ok(())
    }

    fn alt_trans(
        &mut self,
        m: NodeId,
        tu: NodeId,
        unit_id: &str,
        tags: &HashMap<&str, String>,
        preserve: bool,
    ) -> Result<()> {
        let src = self.src;
        let missing = |what: &str| {
            ConvertError::structural(format!("match in unit \"{unit_id}\" has no <{what}>"))
        };
        let match_source = src.child_local(m, "source").ok_or_else(|| missing("source"))?;
        let match_target = src.child_local(m, "target").ok_or_else(|| missing("target"))?;

        self.pad(tu, preserve);
        let alt = self.out.append_element(tu, "alt-trans");
        if let Some(quality) = src.attr(m, "matchQuality").and_then(round_quality) {
            self.out.set_attr(alt, "match-quality", quality.to_string());
        }
        self.out
            .set_attr(alt, "origin", src.attr(m, "origin").unwrap_or("unknown"));

        let s = self.out.append_element(alt, "source");
        self.inline(src.children(match_source), s, tags);
        let t = self.out.append_element(alt, "target");
        self.inline(src.children(match_target), t, tags);
        Ok(())
    }

    /// Remap 2.x inline content into `parent`.
    fn inline(&mut self, nodes: &[NodeId], parent: NodeId, tags: &HashMap<&str, String>) {
        let src = self.src;
        for &node in nodes {
            match src.kind(node) {
                NodeKind::Text(t) | NodeKind::CData(t) => {
                    self.out.append_text(parent, t);
                }
                NodeKind::Element(_) => match src.local_name(node) {
                    "ph" => {
                        let id = src.attr_or_empty(node, "id");
                        let ph = self.out.append_element(parent, "ph");
                        self.out.set_attr(ph, "id", strip_type_prefix(id, "ph"));
                        let data_ref = src.attr(node, "dataRef").unwrap_or(id);
                        if let Some(raw) = tags.get(data_ref) {
                            self.out.append_text(ph, raw);
                        }
                    }
                    "mrk" => {
                        let mrk = self.out.append_element(parent, "mrk");
                        self.out.set_attr(
                            mrk,
                            "mid",
                            strip_type_prefix(src.attr_or_empty(node, "id"), "mrk"),
                        );
                        if let Some(value) = src.attr(node, "value") {
                            self.out.set_attr(mrk, "ts", value);
                        }
                        let mtype = if src.attr(node, "translate") == Some("no") {
                            "protected"
                        } else {
                            "term"
                        };
                        self.out.set_attr(mrk, "mtype", mtype);
                        self.inline(src.children(node), mrk, tags);
                    }
                    other => {
                        debug!(element = other, "inline element flattened to its text");
                        self.inline(src.children(node), parent, tags);
                    }
                },
                _ => {}
            }
        }
    }

    fn pad(&mut self, tu: NodeId, preserve: bool) {
        if preserve {
            self.out.append_text(tu, PRESERVE_CHILD_PAD);
        }
    }
}

fn strip_type_prefix<'s>(id: &'s str, prefix: &str) -> &'s str {
    id.strip_prefix(prefix).unwrap_or(id)
}

/// `matchQuality` rounded to an integer; unparsable values yield nothing.
pub fn round_quality(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round() as i64)
}

/// Read `params.source`, downgrade it and write `params.output`.
pub fn downgrade_file(params: &DowngradeParams) -> Result<DowngradeReport> {
    let source = Path::new(&params.source);
    let output = Path::new(&params.output);
    info!(source = %source.display(), "downgrading XLIFF 2.x");

    let doc = store::read_document(source)?;
    let (mut converted, files, units) = downgrade_counted(&doc)?;

    let validation = StructuralValidator.validate(&converted);
    if !validation.valid {
        warn!(reason = %validation.reason, "downgraded document failed validation");
    }
    store::write_document(output, &mut converted, "UTF-8")?;

    info!(files, units, output = %output.display(), "downgrade finished");
    Ok(DowngradeReport {
        files,
        units,
        valid: validation.valid,
    })
}
