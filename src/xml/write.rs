use quick_xml::escape::{escape, partial_escape};

use super::{Document, NodeId, NodeKind, DOCUMENT};

impl Document {
    /// Serialize the whole document, prolog included.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for &c in self.children(DOCUMENT) {
            self.write_node(c, &mut out);
            out.push('\n');
        }
        out
    }

    /// Serialize one node and its subtree.
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for &c in self.children(id) {
                    self.write_node(c, out);
                }
            }
            NodeKind::Element(e) => {
                out.push('<');
                out.push_str(&e.name);
                for (k, v) in &e.attributes {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v.as_str()));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &c in children {
                    self.write_node(c, out);
                }
                out.push_str("</");
                out.push_str(&e.name);
                out.push('>');
            }
            NodeKind::Text(t) => out.push_str(&partial_escape(t.as_str())),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Pi { target, data } => {
                out.push_str("<?");
                out.push_str(target);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            NodeKind::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t);
                out.push('>');
            }
            NodeKind::Decl(d) => {
                out.push_str("<?xml version=\"");
                out.push_str(&d.version);
                out.push('"');
                if let Some(enc) = &d.encoding {
                    out.push_str(" encoding=\"");
                    out.push_str(enc);
                    out.push('"');
                }
                if let Some(sa) = &d.standalone {
                    out.push_str(" standalone=\"");
                    out.push_str(sa);
                    out.push('"');
                }
                out.push_str("?>");
            }
        }
    }

    /// Rewrite the declared encoding; adds a declaration when there is none.
    pub fn set_declared_encoding(&mut self, encoding: &str) {
        let decl = self
            .children(DOCUMENT)
            .iter()
            .copied()
            .find(|&c| matches!(self.kind(c), NodeKind::Decl(_)));
        match decl {
            Some(id) => {
                if let NodeKind::Decl(d) = &mut self.nodes[id].kind {
                    d.encoding = Some(encoding.to_string());
                }
            }
            None => {
                let id = self.detached(NodeKind::Decl(super::Declaration {
                    encoding: Some(encoding.to_string()),
                    ..Default::default()
                }));
                self.nodes[id].parent = Some(DOCUMENT);
                self.nodes[DOCUMENT].children.insert(0, id);
            }
        }
    }
}
