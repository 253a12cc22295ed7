//! # Note rendering
//!
//! Projects a stored document onto a presentational view tree. The pass
//! is pure: it never mutates its input and never fails; content that
//! does not parse renders as a diagnostic leaf instead. The view tree
//! serializes directly for UI clients, and [`to_html`] flattens it for
//! the public note pages.
use crate::model::{Mark, Node, NodeKind};
use serde::Serialize;
use std::fmt;

/// Shown in place of content that is not valid JSON
const PARSE_FALLBACK: &str = "Failed to parse note content.";
/// Shown when the document root has no content sequence
const EMPTY_FALLBACK: &str = "No content.";

/// A presentational element name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Blockquote,
    Code,
    Div,
    Em,
    /// A heading with its semantic rank
    Heading(i64),
    HorizontalRule,
    ListItem,
    OrderedList,
    Paragraph,
    Pre,
    Span,
    Strong,
    UnorderedList,
}

impl Tag {
    fn is_void(self) -> bool {
        matches!(self, Tag::HorizontalRule)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Blockquote => f.write_str("blockquote"),
            Tag::Code => f.write_str("code"),
            Tag::Div => f.write_str("div"),
            Tag::Em => f.write_str("em"),
            Tag::Heading(rank) => write!(f, "h{}", rank),
            Tag::HorizontalRule => f.write_str("hr"),
            Tag::ListItem => f.write_str("li"),
            Tag::OrderedList => f.write_str("ol"),
            Tag::Paragraph => f.write_str("p"),
            Tag::Pre => f.write_str("pre"),
            Tag::Span => f.write_str("span"),
            Tag::Strong => f.write_str("strong"),
            Tag::UnorderedList => f.write_str("ul"),
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A rendered node: a text run or an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum View {
    Text(String),
    Element(Element),
}

/// A rendered element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: Tag,
    /// Position among siblings; the identity a UI layer keys off
    pub key: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<View>,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Text(text) => f.write_str(&html_escape::encode_text(text)),
            View::Element(el) => el.fmt(f),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        if let Some(class) = self.class {
            write!(f, " class=\"{}\"", class)?;
        }
        if self.tag.is_void() {
            return f.write_str(" />");
        }
        f.write_str(">")?;
        for child in &self.children {
            child.fmt(f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

fn element(tag: Tag, key: usize, class: Option<&'static str>, children: Vec<View>) -> View {
    View::Element(Element {
        tag,
        key,
        class,
        children,
    })
}

fn fallback(message: &str, class: &'static str) -> View {
    element(
        Tag::Paragraph,
        0,
        Some(class),
        vec![View::Text(message.to_owned())],
    )
}

/// Render stored note content.
///
/// Returns the root's children in order. Content that does not parse
/// yields a single diagnostic leaf, as does a root without a content
/// sequence; neither case is an error.
pub fn render_document(content: &str) -> Vec<View> {
    let doc: Node = match serde_json::from_str(content) {
        Ok(doc) => doc,
        Err(_) => return vec![fallback(PARSE_FALLBACK, "render-error")],
    };
    let children = match &doc.content {
        Some(children) => children,
        None => return vec![fallback(EMPTY_FALLBACK, "render-empty")],
    };
    if let NodeKind::Doc = doc.kind {
        children
            .iter()
            .enumerate()
            .map(|(key, node)| render_node(node, key))
            .collect()
    } else {
        vec![render_node(&doc, 0)]
    }
}

/// Render one node, keyed by its position among its siblings.
pub fn render_node(node: &Node, key: usize) -> View {
    match node.kind {
        NodeKind::Text => render_text(node, key),
        NodeKind::HorizontalRule => element(Tag::HorizontalRule, key, None, Vec::new()),
        NodeKind::Doc => element(Tag::Div, key, None, render_children(node)),
        NodeKind::Paragraph => element(Tag::Paragraph, key, None, render_children(node)),
        NodeKind::Heading => {
            let rank = node.level().unwrap_or(1);
            let class = match rank {
                1 => "heading-1",
                2 => "heading-2",
                _ => "heading-3",
            };
            element(Tag::Heading(rank), key, Some(class), render_children(node))
        }
        NodeKind::BulletList => {
            element(Tag::UnorderedList, key, Some("bullet-list"), render_children(node))
        }
        NodeKind::OrderedList => {
            element(Tag::OrderedList, key, Some("ordered-list"), render_children(node))
        }
        NodeKind::ListItem => element(Tag::ListItem, key, None, render_children(node)),
        NodeKind::CodeBlock => {
            let inner = element(Tag::Code, 0, Some("code-block"), render_children(node));
            element(Tag::Pre, key, None, vec![inner])
        }
        NodeKind::Blockquote => element(Tag::Blockquote, key, Some("quote"), render_children(node)),
        NodeKind::Other => element(Tag::Span, key, None, render_children(node)),
    }
}

fn render_children(node: &Node) -> Vec<View> {
    node.content
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .enumerate()
        .map(|(key, child)| render_node(child, key))
        .collect()
}

/// Marks fold left to right, each wrapping the accumulated result, so
/// the last listed mark ends up outermost.
fn render_text(node: &Node, key: usize) -> View {
    let mut result = View::Text(node.text.clone().unwrap_or_default());
    for mark in &node.marks {
        result = match mark {
            Mark::Bold => element(Tag::Strong, 0, None, vec![result]),
            Mark::Italic => element(Tag::Em, 0, None, vec![result]),
            Mark::Code => element(Tag::Code, 0, Some("inline-code"), vec![result]),
            Mark::Other => result,
        };
    }
    element(Tag::Span, key, None, vec![result])
}

/// Serialize rendered views as HTML, for the public note page.
pub fn to_html(views: &[View]) -> String {
    views.iter().map(ToString::to_string).collect()
}
