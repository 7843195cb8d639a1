//! Arena-backed XML document.
//!
//! Nodes live in one `Vec` and reference each other by index, so rewrites
//! (lifting a child out, replacing an element's content, copying a subtree
//! from another document) are index updates instead of pointer surgery.

mod parse;
mod write;

pub use parse::parse;

pub type NodeId = usize;

const DOCUMENT: NodeId = 0;

/// Elements whose children are unit content: whitespace between inline tags
/// is significant, so indentation never enters them.
pub const INLINE_CONTAINERS: &[&str] = &[
    "source", "target", "seg-source", "note", "data", "ph", "mrk", "pc", "sc", "ec", "g", "x",
    "bx", "ex", "bpt", "ept", "it", "sub",
];

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    Pi { target: String, data: String },
    DocType(String),
    Decl(Declaration),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Declaration {
            version: "1.0".into(),
            encoding: Some("UTF-8".into()),
            standalone: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    fn empty() -> Self {
        Document {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: DOCUMENT,
        }
    }

    /// New document holding an XML declaration and an empty root element.
    pub fn with_root(name: &str) -> Self {
        let mut doc = Document::empty();
        doc.append(DOCUMENT, NodeKind::Decl(Declaration::default()));
        doc.root = doc.append_element(DOCUMENT, name);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_node(&self) -> NodeId {
        DOCUMENT
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Qualified name of an element, empty for other node kinds.
    pub fn name(&self, id: NodeId) -> &str {
        self.element(id).map(|e| e.name.as_str()).unwrap_or("")
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self, id: NodeId) -> &str {
        let name = self.name(id);
        match name.rfind(':') {
            Some(pos) => &name[pos + 1..],
            None => name,
        }
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.child_elements(id)
            .filter(|&c| self.name(c) == name)
            .collect()
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&c| self.name(c) == name)
    }

    /// Children matched on local name, so `mda:meta` and `meta` are equal.
    pub fn children_local(&self, id: NodeId, local: &str) -> Vec<NodeId> {
        self.child_elements(id)
            .filter(|&c| self.local_name(c) == local)
            .collect()
    }

    pub fn child_local(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&c| self.local_name(c) == local)
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, or `""` when absent.
    pub fn attr_or_empty(&self, id: NodeId, name: &str) -> &str {
        self.attr(id, name).unwrap_or("")
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(e) = self.element_mut(id) {
            match e.attributes.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => e.attributes.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attributes.retain(|(k, _)| k != name);
        }
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            NodeKind::Element(_) | NodeKind::Document => {
                for &c in &self.nodes[id].children {
                    self.collect_text(c, out);
                }
            }
            _ => {}
        }
    }

    /// Replace all content of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            self.append_text(id, text);
        }
    }

    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.append(
            parent,
            NodeKind::Element(Element {
                name: name.to_string(),
                attributes: Vec::new(),
            }),
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    pub fn append_pi(&mut self, parent: NodeId, target: &str, data: &str) -> NodeId {
        self.append(
            parent,
            NodeKind::Pi {
                target: target.to_string(),
                data: data.to_string(),
            },
        )
    }

    /// Detach every child of `id`. Detached nodes stay in the arena unreachable.
    pub fn clear_children(&mut self, id: NodeId) {
        let old = std::mem::take(&mut self.nodes[id].children);
        for c in old {
            self.nodes[c].parent = None;
        }
    }

    /// Relink `id` to exactly `children`, in order.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        self.clear_children(id);
        for &c in &children {
            if let Some(p) = self.nodes[c].parent {
                self.nodes[p].children.retain(|&x| x != c);
            }
            self.nodes[c].parent = Some(id);
        }
        self.nodes[id].children = children;
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.retain(|&c| c != child);
        self.nodes[child].parent = None;
    }

    /// Deep-copy `src_id` of `src` under `parent`, returning the new node.
    pub fn import(&mut self, parent: NodeId, src: &Document, src_id: NodeId) -> NodeId {
        let id = self.append(parent, src.nodes[src_id].kind.clone());
        for &c in &src.nodes[src_id].children {
            self.import(id, src, c);
        }
        id
    }

    /// Deep-copy all children of `src_id` under `parent`.
    pub fn import_children(&mut self, parent: NodeId, src: &Document, src_id: NodeId) {
        for &c in &src.nodes[src_id].children {
            self.import(parent, src, c);
        }
    }

    /// Parse `raw` as a standalone element and copy it under `parent`.
    pub fn import_fragment(&mut self, parent: NodeId, raw: &str) -> crate::error::Result<NodeId> {
        let fragment = parse(raw)?;
        Ok(self.import(parent, &fragment, fragment.root()))
    }

    /// Processing instructions with the given target among the children of `id`.
    pub fn pis(&self, id: NodeId, target: &str) -> Vec<(NodeId, &str)> {
        self.nodes[id]
            .children
            .iter()
            .filter_map(|&c| match &self.nodes[c].kind {
                NodeKind::Pi { target: t, data } if t == target => Some((c, data.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.nodes[DOCUMENT]
            .children
            .iter()
            .find_map(|&c| match &self.nodes[c].kind {
                NodeKind::Decl(d) => Some(d),
                _ => None,
            })
    }

    /// Indent element-only content below `id`.
    ///
    /// Elements holding non-whitespace text, marked `xml:space="preserve"`, or
    /// carrying translatable content (see [`INLINE_CONTAINERS`]) are left
    /// byte-for-byte as they are.
    pub fn indent(&mut self, id: NodeId, level: usize, step: usize) {
        if !self.is_element(id)
            || self.attr(id, "xml:space") == Some("preserve")
            || INLINE_CONTAINERS.contains(&self.local_name(id))
        {
            return;
        }
        let children = self.nodes[id].children.clone();
        let mixed = children.iter().any(|&c| match &self.nodes[c].kind {
            NodeKind::Text(t) => !t.trim().is_empty(),
            NodeKind::CData(_) => true,
            _ => false,
        });
        if mixed {
            return;
        }

        let inner = format!("\n{}", " ".repeat((level + 1) * step));
        let outer = format!("\n{}", " ".repeat(level * step));
        let mut relinked = Vec::with_capacity(children.len() * 2 + 1);
        for c in children {
            if matches!(self.nodes[c].kind, NodeKind::Text(_)) {
                continue;
            }
            relinked.push(self.detached(NodeKind::Text(inner.clone())));
            relinked.push(c);
            self.indent(c, level + 1, step);
        }
        if !relinked.is_empty() {
            relinked.push(self.detached(NodeKind::Text(outer)));
        }
        self.set_children(id, relinked);
    }

    fn detached(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }
}
