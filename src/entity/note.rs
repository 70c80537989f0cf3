// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp_now;
use crate::error::{NoteboxError, Result};

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build a fresh record from already validated input.
    pub fn new(input: NoteInput) -> Self {
        let now = timestamp_now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            group: input.group,
            created_at: now,
            updated_at: now,
        }
    }

    /// Short id used in listings, e.g. `3f2a9c1`.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..7].to_string()
    }
}

/// Body of create and update requests. Also serves as the editable draft
/// of a note on the client.
///
/// Missing `title` or `content` keys deserialize as empty strings so that
/// they are reported by [`NoteInput::validate`] rather than by the JSON
/// decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl NoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// True when both required fields carry non-whitespace text.
    pub fn has_required_fields(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    /// Trim every field and reject empty title or content.
    ///
    /// A group that is blank after trimming becomes `None`.
    pub fn validate(self) -> Result<NoteInput> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(NoteboxError::Validation("title is required".to_string()));
        }

        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(NoteboxError::Validation("content is required".to_string()));
        }

        let group = self
            .group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());

        Ok(NoteInput {
            title,
            content,
            group,
        })
    }
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            group: note.group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_fields() {
        let input = NoteInput::new("  Groceries ", "\tmilk\n").with_group("  home  ");
        let valid = input.validate().unwrap();
        assert_eq!(valid.title, "Groceries");
        assert_eq!(valid.content, "milk");
        assert_eq!(valid.group, Some("home".to_string()));
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let result = NoteInput::new("   ", "body").validate();
        assert!(matches!(result, Err(NoteboxError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_blank_content() {
        let result = NoteInput::new("title", "").validate();
        assert!(matches!(result, Err(NoteboxError::Validation(_))));
    }

    #[test]
    fn test_blank_group_becomes_none() {
        let valid = NoteInput::new("t", "c").with_group("   ").validate().unwrap();
        assert_eq!(valid.group, None);
    }

    #[test]
    fn test_missing_keys_deserialize_as_empty() {
        let input: NoteInput = serde_json::from_str(r#"{"title": "only title"}"#).unwrap();
        assert_eq!(input.content, "");
        assert!(!input.has_required_fields());
    }

    #[test]
    fn test_note_json_uses_camel_case() {
        let note = Note::new(NoteInput::new("t", "c"));
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["group"], serde_json::Value::Null);
        assert_eq!(note.created_at, note.updated_at);
    }
}
