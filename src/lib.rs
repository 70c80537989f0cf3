pub mod api;
pub mod autosave;
pub mod cli;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod prefs;
pub mod store;
pub mod view;

pub use client::{HttpNotesApi, LocalNotesApi, NotesApi, NotesSession};
pub use entity::{Note, NoteInput};
pub use error::{NoteboxError, Result};
pub use store::NoteStore;
