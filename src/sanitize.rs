//! # Content sanitization
//!
//! Editor output is untrusted. Before a note is persisted, every text
//! run is stripped of markup and every `href`/`src` attribute must name
//! an http(s) or relative URL. The pass walks the raw JSON value, so it
//! covers node kinds this server has never heard of, and it never fails:
//! content that does not even parse is stored as the empty document.
use log::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

/// Base for resolving relative references during URL validation.
///
/// Only the scheme of the resolved URL is ever inspected; the base never
/// appears in stored content.
const URL_BASE: &str = "https://example.com";

/// Check an `href`/`src` value, returning the *original* string if it is
/// acceptable.
///
/// The value is resolved against a fixed base so that relative paths and
/// bare strings count as same-origin links. Anything that resolves to a
/// scheme other than `http` or `https` (`javascript:`, `data:`, `file:`,
/// ...) is rejected, as is anything that cannot be resolved at all.
pub fn sanitize_url(raw: &str) -> Option<&str> {
    let base = Url::parse(URL_BASE).ok()?;
    match base.join(raw) {
        Ok(resolved) => match resolved.scheme() {
            "http" | "https" => Some(raw),
            _ => None,
        },
        Err(_) => None,
    }
}

/// Strips markup from text runs and scrubs URL-bearing attributes.
///
/// Holds a reusable zero-tag [`ammonia`] cleaner; construct once and
/// share freely, the passes themselves are pure.
pub struct Sanitizer {
    cleaner: ammonia::Builder<'static>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        let mut cleaner = ammonia::Builder::default();
        cleaner.tags(HashSet::new());
        Self { cleaner }
    }
}

impl Sanitizer {
    /// Remove all markup from a string, keeping its readable content.
    pub fn clean_text(&self, text: &str) -> String {
        self.cleaner.clean(text).to_string()
    }

    /// Sanitize a parsed document value.
    ///
    /// The output has the same shape as the input: same nesting, same
    /// keys, same order. Only `text` entries, string attributes and the
    /// two URL attributes are narrowed, and a rejected URL attribute is
    /// omitted rather than emptied.
    pub fn sanitize_value(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.sanitize_value(v)).collect())
            }
            Value::Object(entries) => Value::Object(self.sanitize_object(entries)),
            primitive => primitive,
        }
    }

    fn sanitize_object(&self, entries: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in entries {
            match (key.as_str(), value) {
                ("text", Value::String(text)) => {
                    out.insert(key, Value::String(self.clean_text(&text)));
                }
                ("attrs", Value::Object(attrs)) => {
                    out.insert(key, Value::Object(self.sanitize_attrs(attrs)));
                }
                (_, Value::Array(items)) => {
                    let items = items.into_iter().map(|v| self.sanitize_value(v)).collect();
                    out.insert(key, Value::Array(items));
                }
                (_, Value::Object(inner)) => {
                    out.insert(key, Value::Object(self.sanitize_object(inner)));
                }
                (_, other) => {
                    out.insert(key, other);
                }
            }
        }
        out
    }

    fn sanitize_attrs(&self, attrs: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in attrs {
            match (key.as_str(), value) {
                ("href", Value::String(link)) | ("src", Value::String(link)) => {
                    if sanitize_url(&link).is_some() {
                        out.insert(key, Value::String(link));
                    }
                }
                (_, Value::String(text)) => {
                    out.insert(key, Value::String(self.clean_text(&text)));
                }
                (_, other) => {
                    out.insert(key, other);
                }
            }
        }
        out
    }

    /// Sanitize a stored-content string.
    ///
    /// Content that is not valid JSON becomes the empty document `{}`;
    /// nothing unparsed is ever persisted.
    pub fn sanitize_content(&self, json: &str) -> String {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => serde_json::to_string(&self.sanitize_value(value)).unwrap_or_else(|err| {
                warn!("Could not serialize sanitized content: {}", err);
                String::from("{}")
            }),
            Err(_) => String::from("{}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_url, Sanitizer};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn url_keeps_http_and_https() {
        assert_eq!(sanitize_url("https://example.com"), Some("https://example.com"));
        assert_eq!(
            sanitize_url("https://example.com/path?query=1"),
            Some("https://example.com/path?query=1")
        );
        assert_eq!(sanitize_url("http://example.com"), Some("http://example.com"));
    }

    #[test]
    fn url_rejects_dangerous_schemes() {
        assert_eq!(sanitize_url("javascript:alert(1)"), None);
        assert_eq!(sanitize_url("data:text/html,<script>alert(1)</script>"), None);
        assert_eq!(sanitize_url("file:///etc/passwd"), None);
    }

    #[test]
    fn url_treats_relative_references_as_valid() {
        assert_eq!(sanitize_url("not a url"), Some("not a url"));
        assert_eq!(sanitize_url("/path"), Some("/path"));
        assert_eq!(sanitize_url(""), Some(""));
    }

    #[test]
    fn primitives_pass_through() {
        let sanitizer = Sanitizer::default();
        assert_eq!(sanitizer.sanitize_value(json!("string")), json!("string"));
        assert_eq!(sanitizer.sanitize_value(json!(123)), json!(123));
        assert_eq!(sanitizer.sanitize_value(Value::Null), Value::Null);
        assert_eq!(sanitizer.sanitize_value(json!(true)), json!(true));
    }

    #[test]
    fn strips_markup_from_text() {
        let sanitizer = Sanitizer::default();
        let out = sanitizer.sanitize_value(json!({"text": "<script>alert(1)</script>Hello"}));
        assert_eq!(out, json!({"text": "Hello"}));
    }

    #[test]
    fn drops_dangerous_href() {
        let sanitizer = Sanitizer::default();
        let out =
            sanitizer.sanitize_value(json!({"type": "link", "attrs": {"href": "javascript:alert(1)"}}));
        assert_eq!(out, json!({"type": "link", "attrs": {}}));
    }

    #[test]
    fn keeps_safe_href() {
        let sanitizer = Sanitizer::default();
        let input = json!({"type": "link", "attrs": {"href": "https://example.com"}});
        assert_eq!(sanitizer.sanitize_value(input.clone()), input);
    }

    #[test]
    fn drops_dangerous_src() {
        let sanitizer = Sanitizer::default();
        let out =
            sanitizer.sanitize_value(json!({"type": "image", "attrs": {"src": "javascript:alert(1)"}}));
        assert_eq!(out, json!({"type": "image", "attrs": {}}));
    }

    #[test]
    fn recurses_into_content_arrays() {
        let sanitizer = Sanitizer::default();
        let out = sanitizer.sanitize_value(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"text": "<b>test</b>"}]}],
        }));
        assert_eq!(
            out,
            json!({
                "type": "doc",
                "content": [{"type": "paragraph", "content": [{"text": "test"}]}],
            })
        );
    }

    #[test]
    fn recurses_into_nested_objects() {
        let sanitizer = Sanitizer::default();
        let out = sanitizer.sanitize_value(json!({
            "level1": {"level2": {"text": "<script>bad</script>good"}},
        }));
        assert_eq!(out, json!({"level1": {"level2": {"text": "good"}}}));
    }

    #[test]
    fn non_string_attrs_pass_through() {
        let sanitizer = Sanitizer::default();
        let input = json!({"type": "heading", "attrs": {"level": 2, "tight": true}});
        assert_eq!(sanitizer.sanitize_value(input.clone()), input);
    }

    #[test]
    fn content_sanitizes_valid_json() {
        let sanitizer = Sanitizer::default();
        let out = sanitizer.sanitize_content(r#"{"text": "<script>alert(1)</script>Hello"}"#);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"text": "Hello"}));
    }

    #[test]
    fn content_falls_back_to_empty_document() {
        let sanitizer = Sanitizer::default();
        assert_eq!(sanitizer.sanitize_content("not json"), "{}");
        assert_eq!(sanitizer.sanitize_content(""), "{}");
    }

    #[test]
    fn content_pass_is_idempotent() {
        let sanitizer = Sanitizer::default();
        let input = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Hello <img src=x onerror=alert(1)>world"},
                    {"type": "text", "text": "link", "marks": [
                        {"type": "link", "attrs": {"href": "javascript:alert(1)"}}
                    ]},
                ]},
            ],
        })
        .to_string();
        let once = sanitizer.sanitize_content(&input);
        let twice = sanitizer.sanitize_content(&once);
        assert_eq!(once, twice);
    }
}
