//! # Stored content helpers
//!
//! An editing surface re-opens a note from whatever the store holds,
//! which may predate sanitization rules or even JSON storage. Parsing is
//! therefore forgiving: nothing here errors, unparseable content is
//! handed back as-is for the editor to treat as plain text.
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Stored note content, prepared for an editor surface
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    /// Nothing stored yet
    Empty,
    /// Stored content that was not valid JSON, passed through untouched
    Raw(String),
    /// A parsed document value
    Document(Value),
}

/// Serializes as what an editor expects to be seeded with: the parsed
/// document, the raw string, or an empty string.
impl Serialize for ParsedContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParsedContent::Empty => serializer.serialize_str(""),
            ParsedContent::Raw(text) => serializer.serialize_str(text),
            ParsedContent::Document(value) => value.serialize(serializer),
        }
    }
}

/// Parse stored note content.
pub fn parse_content(content: Option<&str>) -> ParsedContent {
    match content {
        None | Some("") => ParsedContent::Empty,
        Some(text) => match serde_json::from_str(text) {
            Ok(value) => ParsedContent::Document(value),
            Err(_) => ParsedContent::Raw(text.to_owned()),
        },
    }
}
