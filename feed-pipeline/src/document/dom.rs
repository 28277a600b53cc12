use super::{decode_entities, DocumentParser, Element, Node, DOCUMENT_ROOT};
use crate::types::{AggregatorError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::{ElementRef, Html};

/// Tree-building realization: quick-xml for feeds, html5ever (through
/// scraper) for pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomDocumentParser;

impl DomDocumentParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for DomDocumentParser {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn parse_xml(&self, content: &str) -> Result<Element> {
        let content = content.trim_start_matches('\u{feff}');
        let mut reader = Reader::from_str(content);
        reader.config_mut().check_end_names = true;

        // Synthetic holder so the root element can be popped like any other.
        let mut stack: Vec<Element> = vec![Element::new(DOCUMENT_ROOT)];

        loop {
            let event = reader.read_event().map_err(|e| {
                AggregatorError::Parse(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(start) => stack.push(open_element(&start)?),
                Event::Empty(start) => {
                    let element = open_element(&start)?;
                    append(&mut stack, Node::Element(element));
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(AggregatorError::Parse("unexpected closing tag".to_string()));
                    }
                    if let Some(element) = stack.pop() {
                        append(&mut stack, Node::Element(element));
                    }
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text);
                    push_text(&mut stack, decode_entities(&raw, false));
                }
                Event::CData(data) => {
                    let raw = String::from_utf8_lossy(&data).into_owned();
                    push_text(&mut stack, raw);
                }
                Event::Eof => break,
                // declarations, comments, processing instructions, doctype
                _ => {}
            }
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
        let html = Html::parse_document(content);
        let mut document = Element::new(DOCUMENT_ROOT);
        document.children.push(Node::Element(convert_html(html.root_element())));
        document
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| AggregatorError::Parse(format!("bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        element.attrs.push((key, decode_entities(&raw, false)));
    }
    Ok(element)
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [Element], text: String) {
    if text.trim().is_empty() {
        return;
    }
    append(stack, Node::Text(text));
}

fn convert_html(element_ref: ElementRef<'_>) -> Element {
    let mut element = Element::new(element_ref.value().name());
    element.attrs = html_attrs(element_ref);
    for child in element_ref.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if name == "script" || name == "style" {
                continue;
            }
            element.children.push(Node::Element(convert_html(child_element)));
        } else if let Some(text) = child.value().as_text() {
            if !text.trim().is_empty() {
                element.children.push(Node::Text(text.to_string()));
            }
        }
    }
    element
}

fn html_attrs(element: ElementRef<'_>) -> Vec<(String, String)> {
    element
        .value()
        .attrs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
