use serde::Serialize;

use crate::xml::{Document, NodeId};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: String,
}

impl Validation {
    fn from_check(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Validation {
                valid: true,
                reason: String::new(),
            },
            Err(reason) => Validation {
                valid: false,
                reason,
            },
        }
    }
}

/// Grammar check run on documents after a structural rewrite.
pub trait Validator {
    fn validate(&self, doc: &Document) -> Validation;
}

/// Checks the required elements and attributes of the declared XLIFF version.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl Validator for StructuralValidator {
    fn validate(&self, doc: &Document) -> Validation {
        Validation::from_check(check(doc))
    }
}

fn check(doc: &Document) -> Result<(), String> {
    let root = doc.root();
    if doc.local_name(root) != "xliff" {
        return Err(format!("root element is <{}>, expected <xliff>", doc.name(root)));
    }
    let version = doc
        .attr(root, "version")
        .ok_or("<xliff> has no version attribute")?;
    match version {
        "1.0" | "1.1" | "1.2" => check_1x(doc, root),
        v if v.starts_with("2.") => check_2x(doc, root),
        other => Err(format!("unknown XLIFF version \"{other}\"")),
    }
}

fn require(doc: &Document, node: NodeId, attr: &str, what: &str) -> Result<(), String> {
    match doc.attr(node, attr) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(format!("{what} lacks required attribute \"{attr}\"")),
    }
}

fn check_1x(doc: &Document, root: NodeId) -> Result<(), String> {
    let files = doc.children_named(root, "file");
    if files.is_empty() {
        return Err("<xliff> has no <file>".into());
    }
    for file in files {
        for attr in ["original", "source-language", "datatype"] {
            require(doc, file, attr, "<file>")?;
        }
        let body = doc
            .child(file, "body")
            .ok_or_else(|| format!("<file original=\"{}\"> has no <body>", doc.attr_or_empty(file, "original")))?;
        check_1x_units(doc, body)?;
    }
    Ok(())
}

fn check_1x_units(doc: &Document, node: NodeId) -> Result<(), String> {
    for child in doc.child_elements(node) {
        match doc.name(child) {
            "trans-unit" => {
                require(doc, child, "id", "<trans-unit>")?;
                if doc.child(child, "source").is_none() {
                    return Err(format!(
                        "<trans-unit id=\"{}\"> has no <source>",
                        doc.attr_or_empty(child, "id")
                    ));
                }
            }
            "group" => check_1x_units(doc, child)?,
            _ => {}
        }
    }
    Ok(())
}

fn check_2x(doc: &Document, root: NodeId) -> Result<(), String> {
    require(doc, root, "srcLang", "<xliff>")?;
    let files = doc.children_local(root, "file");
    if files.is_empty() {
        return Err("<xliff> has no <file>".into());
    }
    for file in files {
        require(doc, file, "id", "<file>")?;
        check_2x_units(doc, file)?;
    }
    Ok(())
}

fn check_2x_units(doc: &Document, node: NodeId) -> Result<(), String> {
    for child in doc.child_elements(node) {
        match doc.local_name(child) {
            "unit" => {
                require(doc, child, "id", "<unit>")?;
                let id = doc.attr_or_empty(child, "id");
                let segments = doc.children_local(child, "segment");
                if segments.is_empty() {
                    return Err(format!("<unit id=\"{id}\"> has no <segment>"));
                }
                let parts = segments
                    .into_iter()
                    .chain(doc.children_local(child, "ignorable"));
                for part in parts {
                    if doc.child_local(part, "source").is_none() {
                        return Err(format!("<unit id=\"{id}\"> has a segment without <source>"));
                    }
                }
            }
            "group" => check_2x_units(doc, child)?,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    fn validate(xml: &str) -> Validation {
        StructuralValidator.validate(&parse(xml).unwrap())
    }

    #[test]
    fn valid_1_2() {
        let v = validate(
            r#"<xliff version="1.2"><file original="a" source-language="en" datatype="xml"><body><group><trans-unit id="1"><source>x</source></trans-unit></group></body></file></xliff>"#,
        );
        assert!(v.valid, "{}", v.reason);
    }

    #[test]
    fn missing_datatype_is_reported() {
        let v = validate(r#"<xliff version="1.2"><file original="a" source-language="en"><body/></file></xliff>"#);
        assert!(!v.valid);
        assert!(v.reason.contains("datatype"));
    }

    #[test]
    fn unit_without_segment_is_invalid_in_2x() {
        let v = validate(r#"<xliff version="2.0" srcLang="en"><file id="f"><unit id="u"/></file></xliff>"#);
        assert!(!v.valid);
        assert!(v.reason.contains("segment"));
    }

    #[test]
    fn valid_2x() {
        let v = validate(
            r#"<xliff version="2.0" srcLang="en"><file id="f"><group id="g"><unit id="u"><segment><source>a</source></segment></unit></group></file></xliff>"#,
        );
        assert!(v.valid, "{}", v.reason);
    }
}
