use super::{decode_entities, DocumentParser, Element, Node, DOCUMENT_ROOT};
use crate::types::{AggregatorError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// One alternative per markup construct. Anything between matches that is not
// whitespace is stray markup.
static XML_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<!\[CDATA\[(?P<cdata>.*?)\]\]>|<!--.*?-->|<\?.*?\?>|<!DOCTYPE[^>]*>|</\s*(?P<close>[^\s>]+)\s*>|<(?P<open>[A-Za-z_][^\s/>]*)(?P<attrs>(?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(?P<selfclose>/)?>|(?P<text>[^<]+)"#,
    )
    .expect("xml token pattern")
});

static HTML_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>|<!\[CDATA\[(?P<cdata>.*?)\]\]>|<!--.*?-->|<\?.*?\?>|<!DOCTYPE[^>]*>|</\s*(?P<close>[^\s>]+)\s*>|<(?P<open>[A-Za-z_][^\s/>]*)(?P<attrs>(?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(?P<selfclose>/)?>|(?P<text>[^<]+)"#,
    )
    .expect("html token pattern")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Scanner realization: a single tokenizing regex and an explicit element
/// stack. Strict on XML, forgiving on HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexDocumentParser;

impl RegexDocumentParser {
    pub fn new() -> Self {
        Self
    }
}

enum Token {
    Text(String),
    Open { name: String, attrs: Vec<(String, String)>, self_closing: bool },
    Close(String),
    Skip,
}

fn classify(caps: &Captures<'_>, html: bool) -> Token {
    if let Some(cdata) = caps.name("cdata") {
        return Token::Text(cdata.as_str().to_string());
    }
    if let Some(close) = caps.name("close") {
        let name = close.as_str();
        return Token::Close(if html { name.to_ascii_lowercase() } else { name.to_string() });
    }
    if let Some(open) = caps.name("open") {
        let name = if html {
            open.as_str().to_ascii_lowercase()
        } else {
            open.as_str().to_string()
        };
        let attrs = caps
            .name("attrs")
            .map(|raw| parse_attributes(raw.as_str(), html))
            .unwrap_or_default();
        return Token::Open {
            name,
            attrs,
            self_closing: caps.name("selfclose").is_some(),
        };
    }
    if let Some(text) = caps.name("text") {
        return Token::Text(decode_entities(text.as_str(), html));
    }
    Token::Skip
}

fn parse_attributes(raw: &str, html: bool) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str(), html))
                .unwrap_or_default();
            let key = if html { key.to_ascii_lowercase() } else { key.to_string() };
            Some((key, value))
        })
        .collect()
}

fn close_top(stack: &mut Vec<Element>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(element) = stack.pop() {
        push_node(stack, Node::Element(element));
    }
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Node::Text(text) = &node {
        if text.trim().is_empty() {
            return;
        }
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

impl DocumentParser for RegexDocumentParser {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn parse_xml(&self, content: &str) -> Result<Element> {
        let content = content.trim_start_matches('\u{feff}');
        let mut stack = vec![Element::new(DOCUMENT_ROOT)];
        let mut position = 0;

        for caps in XML_TOKEN.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            if !content[position..whole.start()].trim().is_empty() {
                return Err(AggregatorError::Parse(format!(
                    "stray markup at byte {}",
                    position
                )));
            }
            position = whole.end();

            match classify(&caps, false) {
                Token::Open { name, attrs, self_closing } => {
                    let element = Element { name, attrs, children: Vec::new() };
                    if self_closing {
                        push_node(&mut stack, Node::Element(element));
                    } else {
                        stack.push(element);
                    }
                }
                Token::Close(name) => {
                    let expected = stack.last().map(|e| e.name.as_str()).unwrap_or_default();
                    if stack.len() < 2 || expected != name {
                        return Err(AggregatorError::Parse(format!(
                            "mismatched closing tag </{}> at byte {}",
                            name,
                            whole.start()
                        )));
                    }
                    close_top(&mut stack);
                }
                Token::Text(text) => push_node(&mut stack, Node::Text(text)),
                Token::Skip => {}
            }
        }

        if !content[position..].trim().is_empty() {
            return Err(AggregatorError::Parse(format!("stray markup at byte {}", position)));
        }
        if stack.len() > 1 {
            let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
            return Err(AggregatorError::Parse(format!("unclosed element <{}>", open)));
        }

        stack
            .pop()
            .and_then(|document| document.elements().next().cloned())
            .ok_or_else(|| AggregatorError::Parse("document has no root element".to_string()))
    }

    fn parse_html(&self, content: &str) -> Element {
        let mut stack = vec![Element::new(DOCUMENT_ROOT)];
        let mut position = 0;

        for caps in HTML_TOKEN.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            // A lone '<' in running text.
            let gap = &content[position..whole.start()];
            if !gap.is_empty() {
                push_node(&mut stack, Node::Text(decode_entities(gap, true)));
            }
            position = whole.end();

            match classify(&caps, true) {
                Token::Open { name, attrs, self_closing } => {
                    let void = VOID_ELEMENTS.contains(&name.as_str());
                    let element = Element { name, attrs, children: Vec::new() };
                    if self_closing || void {
                        push_node(&mut stack, Node::Element(element));
                    } else {
                        stack.push(element);
                    }
                }
                Token::Close(name) => {
                    // Unwind to the nearest matching open element; ignore strays.
                    if let Some(depth) = stack.iter().skip(1).rposition(|e| e.name == name) {
                        while stack.len() > depth + 1 {
                            close_top(&mut stack);
                        }
                    }
                }
                Token::Text(text) => push_node(&mut stack, Node::Text(text)),
                Token::Skip => {}
            }
        }

        let tail = &content[position..];
        if !tail.is_empty() {
            push_node(&mut stack, Node::Text(decode_entities(tail, true)));
        }
        while stack.len() > 1 {
            close_top(&mut stack);
        }
        stack.pop().unwrap_or_else(|| Element::new(DOCUMENT_ROOT))
    }
}
