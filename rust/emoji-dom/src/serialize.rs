//! HTML serialization

use crate::dom::{Document, NodeData, NodeId};
use crate::html_parser::is_void_element;

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

impl Document {
    /// Serialize the node itself and its subtree
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    /// Serialize the children of a node
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self
            .element(id)
            .is_some_and(|e| matches!(&*e.name, "style" | "script"));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => out.push_str(&self.inner_html(id)),
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => escape_text(text, out),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for attr in &element.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    escape_attribute(&attr.value, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&element.name) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}
