//! A small owned XML tree, that can be edited in place and written back
//!
//! Documents are read with `roxmltree` and written with `quick_xml`.
//! Unknown elements, attributes, comments and namespace declarations survive a load/edit/write cycle.

use std::borrow::Cow;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{FormatError, FormatResult};

/// A node of an element's content
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An XML element, with its (possibly prefixed) name, attributes and content
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Create an element that only contains some text
    pub fn with_text<S: Into<String>, T: Into<String>>(name: S, text: T) -> Self {
        let mut element = Self::new(name);
        element.append_text(text);
        element
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn nodes(&self) -> &[Node] { &self.nodes }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Iterates over the child elements, skipping text and comments
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Returns the first child element that has the given name
    pub fn find_child<S: AsRef<str>>(&self, searched_name: S) -> Option<&Element> {
        let searched_name = searched_name.as_ref();
        self.children().find(|el| el.name() == searched_name)
    }

    pub fn find_child_mut(&mut self, searched_name: &str) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|node| match node {
            Node::Element(el) if el.name == searched_name => Some(el),
            _ => None,
        })
    }

    /// Returns every child element that has the given name, in document order
    pub fn find_children<'a>(&'a self, searched_name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |el| el.name() == searched_name)
    }

    /// The concatenated text directly contained in this element
    pub fn text(&self) -> String {
        self.nodes.iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Append a child element, and return a reference to it
    pub fn append_child(&mut self, child: Element) -> &mut Element {
        self.nodes.push(Node::Element(child));
        match self.nodes.last_mut() {
            Some(Node::Element(el)) => el,
            _ => unreachable!("an element has just been pushed"),
        }
    }

    pub fn append_text<T: Into<String>>(&mut self, text: T) {
        let text = text.into();
        if !text.is_empty() {
            self.nodes.push(Node::Text(text));
        }
    }

    /// Remove every child element with the given name. Returns how many were removed
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| match node {
            Node::Element(el) => el.name() != name,
            _ => true,
        });
        before - self.nodes.len()
    }

    /// Replace every child named `name` with a single new one holding `text`, at the end of this element
    pub fn replace_text_child<T: Into<String>>(&mut self, name: &str, text: T) -> &mut Element {
        self.remove_children(name);
        self.append_child(Element::with_text(name, text))
    }

    /// Parse a document and return its root element.
    ///
    /// Some Kolab clients in the wild wrote ISO-8859-1 attachments while claiming UTF-8.
    /// Such input is not valid UTF-8, so it is decoded again as ISO-8859-1 before giving up.
    pub fn parse(bytes: &[u8]) -> FormatResult<Element> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(err) => {
                log::warn!("Kolab XML is not valid UTF-8 ({}). Retrying as ISO-8859-1", err);
                Cow::Owned(bytes.iter().map(|&b| b as char).collect::<String>())
            },
        };

        let doc = roxmltree::Document::parse(&text)
            .map_err(|err| FormatError::Parse(err.to_string()))?;
        Ok(convert(doc.root_element()))
    }

    /// Serialize this element as the root of a UTF-8 document
    pub fn to_document(&self) -> FormatResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Build an owned element from a parsed node
fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = Element::new(qualified_name(node, node.tag_name().namespace(), node.tag_name().name()));

    // Namespaces that this very element declares
    let inherited: Vec<(Option<&str>, &str)> = match node.parent_element() {
        Some(parent) => parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect(),
        None => Vec::new(),
    };
    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        match ns.name() {
            Some(prefix) => element.set_attr(format!("xmlns:{}", prefix), ns.uri()),
            None => element.set_attr("xmlns", ns.uri()),
        }
    }

    for attr in node.attributes() {
        element.set_attr(qualified_name(node, attr.namespace(), attr.name()), attr.value());
    }

    let has_child_elements = node.children().any(|child| child.is_element());
    for child in node.children() {
        if child.is_element() {
            element.nodes.push(Node::Element(convert(child)));
        } else if child.is_text() {
            let text = child.text().unwrap_or("");
            // Blank removal: indentation between elements is not content
            if has_child_elements && text.trim().is_empty() {
                continue;
            }
            element.append_text(text);
        } else if child.is_comment() {
            element.nodes.push(Node::Comment(child.text().unwrap_or("").to_string()));
        }
    }
    element
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> std::io::Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.nodes.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;
    for node in &element.nodes {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Node::Comment(text) => writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))
}
