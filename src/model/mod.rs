//! # The document model
//!
//! Notes are stored as the JSON serialization of an editor document: a
//! `doc` root with nested block and inline nodes, text leaves carrying
//! optional marks. The set of kinds the server knows is closed, but the
//! serde model never rejects a discriminant it has not seen; unknown
//! kinds collapse into [`NodeKind::Other`] and keep their children.
mod de;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The structural kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "&'static str")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    Blockquote,
    HorizontalRule,
    Text,
    /// Any discriminant without special handling
    Other,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Other
    }
}

impl From<&str> for NodeKind {
    fn from(kind: &str) -> NodeKind {
        match kind {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "bulletList" => NodeKind::BulletList,
            "orderedList" => NodeKind::OrderedList,
            "listItem" => NodeKind::ListItem,
            "codeBlock" => NodeKind::CodeBlock,
            "blockquote" => NodeKind::Blockquote,
            "horizontalRule" => NodeKind::HorizontalRule,
            "text" => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }
}

impl From<String> for NodeKind {
    fn from(kind: String) -> NodeKind {
        NodeKind::from(kind.as_str())
    }
}

impl From<NodeKind> for &'static str {
    fn from(kind: NodeKind) -> &'static str {
        match kind {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::CodeBlock => "codeBlock",
            NodeKind::Blockquote => "blockquote",
            NodeKind::HorizontalRule => "horizontalRule",
            NodeKind::Text => "text",
            NodeKind::Other => "other",
        }
    }
}

/// A formatting annotation on a text leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Code,
    /// Any mark kind without special handling
    #[serde(other)]
    Other,
}

/// A node of the document tree
///
/// `attrs` is an open mapping; only `level`, `href` and `src` have
/// meaning to the server, and the latter two only to the sanitizer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Node {
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(
        default,
        deserialize_with = "de::deserialize_or_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Fragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "de::deserialize_or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<Mark>,
}

pub type Fragment = Vec<Node>;

impl Node {
    /// A text leaf without marks
    pub fn text<S: Into<String>>(text: S) -> Node {
        Node {
            kind: NodeKind::Text,
            text: Some(text.into()),
            ..Node::default()
        }
    }

    /// A container node of the given kind
    pub fn container(kind: NodeKind, content: Fragment) -> Node {
        Node {
            kind,
            content: Some(content),
            ..Node::default()
        }
    }

    /// The heading rank from `attrs.level`, if present
    pub fn level(&self) -> Option<i64> {
        self.attrs.get("level").and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::{Mark, Node, NodeKind};

    #[test]
    fn null_attrs_and_marks() {
        let node: Node =
            serde_json::from_str(r#"{"type": "paragraph", "attrs": null, "marks": null}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Paragraph);
        assert!(node.attrs.is_empty());
        assert!(node.marks.is_empty());
        assert!(node.content.is_none());
    }

    #[test]
    fn unknown_discriminant_keeps_children() {
        let node: Node = serde_json::from_str(
            r#"{"type": "callout", "content": [{"type": "text", "text": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(node.kind, NodeKind::Other);
        let content = node.content.unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn missing_discriminant_is_other() {
        let node: Node = serde_json::from_str(r#"{"text": "plain"}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Other);
        assert_eq!(node.text.as_deref(), Some("plain"));
    }

    #[test]
    fn unknown_mark_is_other() {
        let node: Node = serde_json::from_str(
            r#"{"type": "text", "text": "x", "marks": [{"type": "strike"}, {"type": "bold"}]}"#,
        )
        .unwrap();
        assert_eq!(node.marks, vec![Mark::Other, Mark::Bold]);
    }

    #[test]
    fn heading_level_attr() {
        let node: Node =
            serde_json::from_str(r#"{"type": "heading", "attrs": {"level": 2}}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Heading);
        assert_eq!(node.level(), Some(2));
    }
}
