//! Join several single-file XLIFF documents into one multi-file document.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ConvertError, Result};
use crate::services::path_trie::{self, make_relative};
use crate::services::store;
use crate::services::validation::{StructuralValidator, Validator};
use crate::xml::Document;

#[derive(Debug, Serialize)]
pub struct JoinReport {
    pub files: usize,
    pub common_root: String,
    pub output: PathBuf,
    pub valid: bool,
}

/// Version and languages every input has to agree on.
#[derive(Debug, Default)]
struct Agreement {
    version: Option<String>,
    source_language: Option<String>,
    target_language: Option<String>,
}

impl Agreement {
    fn is_2x(&self) -> bool {
        self.version.as_deref().map_or(false, |v| v.starts_with("2."))
    }

    fn admit(&mut self, path: &Path, doc: &Document) -> Result<()> {
        let root = doc.root();
        agree(&mut self.version, doc.attr_or_empty(root, "version"), "XLIFF version", path)?;
        if !self.is_2x() {
            return Ok(());
        }
        agree(&mut self.source_language, doc.attr_or_empty(root, "srcLang"), "source language", path)?;
        if let Some(trg) = doc.attr(root, "trgLang").filter(|t| !t.is_empty()) {
            agree(&mut self.target_language, trg, "target language", path)?;
        }
        Ok(())
    }
}

/// Record `value` in an empty slot, or check it against the recorded one.
fn agree(slot: &mut Option<String>, value: &str, what: &str, path: &Path) -> Result<()> {
    match slot.as_deref() {
        Some(expected) if expected != value => Err(ConvertError::IncompatibleInputs(format!(
            "{} declares {what} \"{value}\", expected \"{expected}\"",
            path.display()
        ))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

fn is_namespace_attr(name: &str) -> bool {
    name == "xmlns" || name.contains(':')
}

/// Join `inputs` into `output`. Nothing is written unless every input is
/// readable and compatible.
pub fn join(inputs: &[PathBuf], output: &Path) -> Result<JoinReport> {
    if inputs.is_empty() {
        return Err(ConvertError::Config("no XLIFF files to join".into()));
    }
    info!(inputs = inputs.len(), output = %output.display(), "joining XLIFF files");

    let docs = inputs
        .iter()
        .map(|p| store::read_document(p).map(|d| (p.as_path(), d)))
        .collect::<Result<Vec<_>>>()?;

    let mut agreement = Agreement::default();
    let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
    let mut originals: BTreeSet<String> = BTreeSet::new();
    for (path, doc) in &docs {
        agreement.admit(path, doc)?;
        let root = doc.root();
        for (name, value) in doc.attributes(root) {
            if is_namespace_attr(name) {
                namespaces.insert(name.clone(), value.clone());
            }
        }
        for file in doc.children_local(root, "file") {
            originals.insert(doc.attr_or_empty(file, "original").to_string());
        }
    }

    let common_root = path_trie::common_root(originals.iter().map(String::as_str));
    info!(common_root = %common_root, files = originals.len(), "computed common root");

    let mut joined = Document::with_root("xliff");
    let root = joined.root();
    joined.set_attr(root, "version", agreement.version.clone().unwrap_or_default());
    if agreement.is_2x() {
        joined.set_attr(root, "srcLang", agreement.source_language.clone().unwrap_or_default());
        if let Some(trg) = &agreement.target_language {
            joined.set_attr(root, "trgLang", trg.as_str());
        }
    }
    for (name, value) in namespaces {
        joined.set_attr(root, &name, value);
    }

    let mut count = 0usize;
    for (_, doc) in &docs {
        for file in doc.children_local(doc.root(), "file") {
            let copy = joined.import(root, doc, file);
            let original = make_relative(&common_root, doc.attr_or_empty(file, "original"));
            joined.set_attr(copy, "original", original);
            if agreement.is_2x() {
                joined.set_attr(copy, "id", count.to_string());
            }
            count += 1;
        }
    }
    joined.indent(root, 0, 2);

    let validation = StructuralValidator.validate(&joined);
    if !validation.valid {
        warn!(reason = %validation.reason, "joined document failed validation");
    }
    store::write_document(output, &mut joined, "UTF-8")?;

    info!(files = count, output = %output.display(), "join finished");
    Ok(JoinReport {
        files: count,
        common_root,
        output: output.to_path_buf(),
        valid: validation.valid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, xml: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn mixed_versions_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.xlf", r#"<xliff version="1.2"><file original="/p/a.xml"/></xliff>"#);
        let b = write(
            dir.path(),
            "b.xlf",
            r#"<xliff version="2.0" srcLang="en"><file id="f" original="/p/b.xml"/></xliff>"#,
        );
        let out = dir.path().join("joined.xlf");
        let err = join(&[a, b], &out).unwrap_err();
        assert!(matches!(err, ConvertError::IncompatibleInputs(_)));
        assert!(!out.exists());
    }

    #[test]
    fn different_target_languages_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.xlf", r#"<xliff version="2.0" srcLang="en" trgLang="fr"/>"#);
        let b = write(dir.path(), "b.xlf", r#"<xliff version="2.0" srcLang="en" trgLang="de"/>"#);
        let err = join(&[a, b], &dir.path().join("o.xlf")).unwrap_err();
        assert!(matches!(err, ConvertError::IncompatibleInputs(_)));
    }

    #[test]
    fn files_are_renumbered_and_made_relative() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "a.xlf",
            r#"<xliff xmlns="urn:oasis:names:tc:xliff:document:2.0" version="2.0" srcLang="en" trgLang="fr"><file id="f1" original="/proj/src/a.xml"><unit id="1"><segment><source>A</source></segment></unit></file></xliff>"#,
        );
        let b = write(
            dir.path(),
            "b.xlf",
            r#"<xliff xmlns:mda="urn:oasis:names:tc:xliff:metadata:2.0" version="2.0" srcLang="en"><file id="f1" original="/proj/src/sub/b.xml"><unit id="1"><segment><source>B</source></segment></unit></file></xliff>"#,
        );
        let out = dir.path().join("joined.xlf");
        let report = join(&[a, b], &out).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.common_root, "/proj/src/");
        assert!(report.valid);

        let doc = store::read_document(&out).unwrap();
        let root = doc.root();
        let names: Vec<&str> = doc.attributes(root).iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["version", "srcLang", "trgLang", "xmlns", "xmlns:mda"]);
        let files = doc.children_named(root, "file");
        assert_eq!(doc.attr(files[0], "id"), Some("0"));
        assert_eq!(doc.attr(files[1], "id"), Some("1"));
        assert_eq!(doc.attr(files[0], "original"), Some("a.xml"));
        assert_eq!(doc.attr(files[1], "original"), Some("sub/b.xml"));
    }
}
