//! A small node-building HTML layer.
//!
//! Text flows through [`escape`] unconditionally; raw fragments exist only
//! behind the explicit [`raw`] wrapper, which is how the configuration's
//! `head` and `hero` snippets reach the page.

use std::fmt::Write;

/// Escapes `&<>'"` as named entities.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for character in input.chars() {
        match character {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\'' => output.push_str("&#39;"),
            '"' => output.push_str("&quot;"),
            other => output.push(other),
        }
    }
    output
}

/// One node of the document tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// Escaped text.
    Text(String),
    /// A raw, pre-trusted fragment.
    Raw(String),
    /// An element with attributes and children.
    Element(Element),
}

/// An HTML element under construction.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

/// Starts an element.
#[must_use]
pub fn element(tag: &str) -> Element {
    Element {
        tag: tag.to_owned(),
        attributes: Vec::new(),
        children: Vec::new(),
    }
}

/// Wraps a pre-trusted fragment.
#[must_use]
pub fn raw(content: impl Into<String>) -> Node {
    Node::Raw(content.into())
}

/// Wraps escaped text.
#[must_use]
pub fn text(content: impl Into<String>) -> Node {
    Node::Text(content.into())
}

// Elements that never take a closing tag.
const VOID_TAGS: &[&str] = &["meta", "link", "img", "input", "br", "hr"];

impl Element {
    /// Adds an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_owned(), value.into()));
        self
    }

    /// Shorthand for the `class` attribute.
    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Appends every node of an iterator.
    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Appends an escaped text child.
    #[must_use]
    pub fn text(self, content: impl Into<String>) -> Self {
        self.child(Node::Text(content.into()))
    }

    /// Renders the element and its subtree.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();
        self.render_into(&mut output);
        output
    }

    fn render_into(&self, output: &mut String) {
        let _ = write!(output, "<{}", self.tag);
        for (name, value) in &self.attributes {
            if value.is_empty() {
                let _ = write!(output, " {name}");
            } else {
                let _ = write!(output, " {name}=\"{}\"", escape(value));
            }
        }
        output.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Text(content) => output.push_str(&escape(content)),
                Node::Raw(content) => output.push_str(content),
                Node::Element(inner) => inner.render_into(output),
            }
        }
        let _ = write!(output, "</{}>", self.tag);
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Renders a full page: doctype plus the `<html>` subtree.
#[must_use]
pub fn document(html: Element) -> String {
    let mut output = String::from("<!DOCTYPE html>");
    output.push_str(&html.render());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_escaped() {
        let rendered = element("p").text("<b>&'\"</b>").render();
        assert_eq!(rendered, "<p>&lt;b&gt;&amp;&#39;&quot;&lt;/b&gt;</p>");
    }

    #[test]
    fn raw_fragments_pass_through() {
        let rendered = element("div").child(raw("<script>x()</script>")).render();
        assert_eq!(rendered, "<div><script>x()</script></div>");
    }

    #[test]
    fn attributes_are_escaped() {
        let rendered = element("a").attr("href", "/x?a=1&b=\"2\"").render();
        assert_eq!(rendered, "<a href=\"/x?a=1&amp;b=&quot;2&quot;\"></a>");
    }

    #[test]
    fn void_elements_do_not_close() {
        let rendered = element("meta").attr("charset", "utf-8").render();
        assert_eq!(rendered, "<meta charset=\"utf-8\">");
    }

    #[test]
    fn empty_attribute_values_render_bare() {
        let rendered = element("script").attr("async", "").attr("defer", "").render();
        assert_eq!(rendered, "<script async defer></script>");
    }
}
