use uuid::Uuid;

use crate::entity::Note;
use crate::error::{NoteboxError, Result};
use crate::view;

/// Notes last fetched from the API, patched after successful mutations.
#[derive(Debug, Default, Clone)]
pub struct NoteCache {
    notes: Vec<Note>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == *id)
    }

    /// Add a record returned by create. A record already present is replaced
    /// rather than duplicated.
    pub fn apply_created(&mut self, note: Note) {
        if !self.apply_updated(note.clone()) {
            self.notes.push(note);
        }
    }

    /// Swap in the server's version of a note. Returns false when the id is
    /// no longer cached, in which case nothing changes.
    pub fn apply_updated(&mut self, note: Note) -> bool {
        match self.notes.iter_mut().find(|n| n.id == note.id) {
            Some(slot) => {
                *slot = note;
                true
            }
            None => false,
        }
    }

    /// Remove a note. Removing an absent id is a no-op.
    pub fn apply_deleted(&mut self, id: &Uuid) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != *id);
        self.notes.len() != before
    }

    /// Find a note by full id or unique id prefix.
    pub fn resolve(&self, id: &str) -> Result<&Note> {
        let needle = id.trim().to_lowercase();
        if needle.is_empty() {
            return Err(NoteboxError::Validation("note id is required".to_string()));
        }

        let mut matches = self
            .notes
            .iter()
            .filter(|n| n.id.to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(note), None) => Ok(note),
            (None, _) => Err(NoteboxError::NotFound(id.to_string())),
            (Some(_), Some(_)) => Err(NoteboxError::Validation(format!(
                "id prefix '{}' matches more than one note",
                id
            ))),
        }
    }

    /// Distinct group labels across cached notes.
    pub fn groups(&self) -> Vec<String> {
        view::groups(&self.notes)
    }
}
