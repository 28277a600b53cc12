//! Parsed-document capability shared by the feed parser and the scraper.
//!
//! Both realizations produce the same owned [`Element`] tree, so everything
//! above this module queries one shape regardless of how the bytes were read.

pub mod dom;
pub mod regex_scan;

use crate::types::Result;
use html_escape::decode_html_entities;
use quick_xml::escape::{escape, partial_escape, unescape};

pub use dom::DomDocumentParser;
pub use regex_scan::RegexDocumentParser;

/// Name of the synthetic element wrapping a parsed HTML document.
pub const DOCUMENT_ROOT: &str = "#document";

pub trait DocumentParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parse a feed document and return its root element. Fails when the
    /// input is not well-formed XML.
    fn parse_xml(&self, content: &str) -> Result<Element>;

    /// Parse an HTML page or fragment. Never fails; malformed markup yields
    /// whatever structure could be recovered under [`DOCUMENT_ROOT`].
    fn parse_html(&self, content: &str) -> Element;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written (`media:thumbnail`, `content:encoded`).
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Case-insensitive match on the qualified name.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Direct element children.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.is(name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.is(name))
    }

    /// First descendant (depth-first, document order) with this name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for element in self.elements() {
            if element.is(name) {
                return Some(element);
            }
            if let Some(found) = element.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with this name, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for element in self.elements() {
            if element.is(name) {
                found.push(element);
            }
            element.collect_named(name, found);
        }
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Trimmed text of the first child with this name, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|element| element.text().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Children re-serialized as markup. Used for inline XHTML bodies.
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&partial_escape(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value));
                out.push('"');
            }
            if element.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &element.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

/// Decode character references. XML mode goes through quick-xml's unescaper
/// (predefined entities and numeric references). HTML mode, and XML text
/// quick-xml rejects because it carries HTML named entities, use the full
/// HTML entity table. Unknown references are left untouched.
pub fn decode_entities(raw: &str, html: bool) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    if !html {
        if let Ok(decoded) = unescape(raw) {
            return decoded.into_owned();
        }
    }
    decode_html_entities(raw).into_owned()
}
