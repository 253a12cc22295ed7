//! # Input validation
//!
//! Shape checks for the write paths: presence, length, id syntax. What
//! the content *says* is the sanitizer's concern, not this module's.
use displaydoc::Display;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted title, in characters
const TITLE_MAX: usize = 200;

/// A rejected input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Display)]
pub enum ValidationError {
    /// Title is required
    TitleRequired,
    /// Title is too long
    TitleTooLong,
    /// Content is required
    ContentRequired,
    /// Invalid note ID
    InvalidNoteId,
    /// Invalid sharing flag
    InvalidSharingFlag,
}

impl ValidationError {
    /// The input field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::TitleRequired | ValidationError::TitleTooLong => "title",
            ValidationError::ContentRequired => "content_json",
            ValidationError::InvalidNoteId => "id",
            ValidationError::InvalidSharingFlag => "enable",
        }
    }
}

/// Raw fields of a create/update payload, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteParams {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content_json: Option<String>,
}

/// A validated create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNote {
    pub title: String,
    pub content_json: String,
}

/// A validated update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNote {
    pub id: Uuid,
    pub title: String,
    pub content_json: String,
}

/// A validated sharing toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleSharing {
    pub note_id: String,
    pub enable: bool,
}

fn validate_title(title: Option<String>) -> Result<String, ValidationError> {
    let title = title.unwrap_or_default();
    if title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(title)
}

fn validate_content(content: Option<String>) -> Result<String, ValidationError> {
    match content {
        Some(content) if !content.is_empty() => Ok(content),
        _ => Err(ValidationError::ContentRequired),
    }
}

pub fn validate_create(params: NoteParams) -> Result<CreateNote, ValidationError> {
    Ok(CreateNote {
        title: validate_title(params.title)?,
        content_json: validate_content(params.content_json)?,
    })
}

pub fn validate_update(params: NoteParams) -> Result<UpdateNote, ValidationError> {
    let id = params
        .id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or(ValidationError::InvalidNoteId)?;
    Ok(UpdateNote {
        id,
        title: validate_title(params.title)?,
        content_json: validate_content(params.content_json)?,
    })
}

/// The sharing flag arrives as a form value; only the literal strings
/// `true` and `false` are accepted.
pub fn validate_sharing(note_id: &str, enable: &str) -> Result<ToggleSharing, ValidationError> {
    let enable = match enable {
        "true" => true,
        "false" => false,
        _ => return Err(ValidationError::InvalidSharingFlag),
    };
    Ok(ToggleSharing {
        note_id: note_id.to_owned(),
        enable,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        validate_create, validate_sharing, validate_update, NoteParams, ValidationError,
    };

    fn params(id: Option<&str>, title: &str, content: &str) -> NoteParams {
        NoteParams {
            id: id.map(str::to_owned),
            title: Some(title.to_owned()),
            content_json: Some(content.to_owned()),
        }
    }

    #[test]
    fn create_accepts_title_and_content() {
        let form = validate_create(params(None, "My Note", r#"{"type":"doc","content":[]}"#));
        assert!(form.is_ok());
    }

    #[test]
    fn create_rejects_empty_title() {
        let err = validate_create(params(None, "", r#"{"type":"doc"}"#)).unwrap_err();
        assert_eq!(err, ValidationError::TitleRequired);
        assert_eq!(err.field(), "title");
        assert_eq!(err.to_string(), "Title is required");
    }

    #[test]
    fn create_rejects_overlong_title() {
        let long = "a".repeat(201);
        let err = validate_create(params(None, &long, r#"{"type":"doc"}"#)).unwrap_err();
        assert_eq!(err, ValidationError::TitleTooLong);
        assert_eq!(err.to_string(), "Title is too long");
    }

    #[test]
    fn title_length_is_measured_in_chars() {
        let long = "ä".repeat(200);
        assert!(validate_create(params(None, &long, r#"{"type":"doc"}"#)).is_ok());
    }

    #[test]
    fn create_rejects_empty_content() {
        let err = validate_create(params(None, "My Note", "")).unwrap_err();
        assert_eq!(err, ValidationError::ContentRequired);
        assert_eq!(err.to_string(), "Content is required");
    }

    #[test]
    fn update_accepts_a_uuid_id() {
        let form = validate_update(params(
            Some("550e8400-e29b-41d4-a716-446655440000"),
            "Updated Note",
            r#"{"type":"doc","content":[]}"#,
        ));
        assert!(form.is_ok());
    }

    #[test]
    fn update_rejects_a_malformed_id() {
        let err =
            validate_update(params(Some("not-a-uuid"), "My Note", r#"{"type":"doc"}"#)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidNoteId);
        assert_eq!(err.to_string(), "Invalid note ID");
    }

    #[test]
    fn sharing_flag_normalizes_to_bool() {
        assert!(validate_sharing("some-id", "true").unwrap().enable);
        assert!(!validate_sharing("some-id", "false").unwrap().enable);
    }

    #[test]
    fn sharing_flag_accepts_only_the_literals() {
        let err = validate_sharing("some-id", "yes").unwrap_err();
        assert_eq!(err, ValidationError::InvalidSharingFlag);
    }
}
