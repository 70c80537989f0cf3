//! Debounced autosave of a note being edited.
//!
//! [`AutosaveMachine`] is the synchronous state machine; it is driven by
//! explicit timestamps so it can be stepped in tests. [`AutosaveHandle`]
//! runs it on a tokio task with a real timer.

mod driver;

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};

pub use driver::{AutosaveEvent, AutosaveHandle};

/// Quiet period after the last edit before an automatic save.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Draft equals the last saved snapshot
    Clean,
    /// Draft has unsaved changes
    Dirty,
    /// A save is in flight
    Saving,
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveState::Clean => write!(f, "Saved"),
            SaveState::Dirty => write!(f, "Unsaved changes"),
            SaveState::Saving => write!(f, "Saving…"),
        }
    }
}

/// Why a save was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Nothing changed since the last save
    Clean,
    /// Title or content is blank
    MissingFields,
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::Clean => write!(f, "nothing to save"),
            Refusal::MissingFields => write!(f, "please add a title and content"),
        }
    }
}

/// A save the caller must now perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub note_id: Uuid,
    pub draft: NoteInput,
    /// Edit counter at the time the save started
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveDecision {
    Start(SaveRequest),
    /// A save is already in flight; this one runs after it completes
    Deferred,
    Refused(Refusal),
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(Note),
    /// Response for a different note; ignored
    Stale(Note),
    Failed(NoteboxError),
}

pub struct AutosaveMachine {
    note_id: Uuid,
    snapshot: NoteInput,
    draft: NoteInput,
    debounce: Duration,
    deadline: Option<Instant>,
    in_flight: bool,
    deferred: bool,
    revision: u64,
}

impl AutosaveMachine {
    pub fn new(note: &Note, debounce: Duration) -> Self {
        let snapshot = NoteInput::from(note);
        Self {
            note_id: note.id,
            draft: snapshot.clone(),
            snapshot,
            debounce,
            deadline: None,
            in_flight: false,
            deferred: false,
            revision: 0,
        }
    }

    pub fn note_id(&self) -> Uuid {
        self.note_id
    }

    pub fn draft(&self) -> &NoteInput {
        &self.draft
    }

    pub fn snapshot(&self) -> &NoteInput {
        &self.snapshot
    }

    /// When the debounce timer fires, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn state(&self) -> SaveState {
        if self.in_flight {
            SaveState::Saving
        } else if self.draft != self.snapshot {
            SaveState::Dirty
        } else {
            SaveState::Clean
        }
    }

    fn is_dirty(&self) -> bool {
        self.draft != self.snapshot
    }

    /// Replace the draft. A diverging draft (re)arms the timer; a draft back
    /// at the snapshot clears it.
    pub fn edit(&mut self, draft: NoteInput, now: Instant) {
        self.draft = draft;
        self.revision += 1;
        self.deadline = if self.is_dirty() {
            Some(now + self.debounce)
        } else {
            None
        };
    }

    /// Called when the timer may have fired. `None` when nothing is due.
    pub fn on_timer(&mut self, now: Instant) -> Option<SaveDecision> {
        match self.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return None,
        }
        self.deadline = None;

        if !self.is_dirty() {
            return None;
        }
        Some(self.try_start())
    }

    /// Manual save: runs at once unless clean, incomplete or already saving.
    pub fn request_save(&mut self) -> SaveDecision {
        if !self.in_flight && !self.is_dirty() {
            return SaveDecision::Refused(Refusal::Clean);
        }
        self.try_start()
    }

    fn try_start(&mut self) -> SaveDecision {
        if !self.draft.has_required_fields() {
            return SaveDecision::Refused(Refusal::MissingFields);
        }
        if self.in_flight {
            self.deferred = true;
            return SaveDecision::Deferred;
        }

        self.deadline = None;
        self.in_flight = true;
        SaveDecision::Start(SaveRequest {
            note_id: self.note_id,
            draft: self.draft.clone(),
            revision: self.revision,
        })
    }

    /// Record the result of the save started by `request`.
    pub fn complete(&mut self, request: &SaveRequest, result: Result<Note>, now: Instant) -> SaveOutcome {
        self.in_flight = false;

        let mut saved = false;
        let outcome = match result {
            Ok(note) if note.id != self.note_id => SaveOutcome::Stale(note),
            Ok(note) => {
                // the sent draft, not the server copy, so trimming does not re-dirty
                self.snapshot = request.draft.clone();
                saved = true;
                SaveOutcome::Saved(note)
            }
            Err(e) => SaveOutcome::Failed(e),
        };

        if self.deferred {
            self.deferred = false;
            if self.is_dirty() {
                self.deadline = Some(now);
            }
        } else if saved && self.is_dirty() && self.deadline.is_none() {
            // an edit made while saving may only diverge from the new snapshot
            self.deadline = Some(now + self.debounce);
        }

        outcome
    }
}
