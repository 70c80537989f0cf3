//! Client side of the notes API: transport backends, the in-memory note
//! cache and the session tying them together.

mod cache;
mod http;
mod local;
mod session;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::{Note, NoteInput};
use crate::error::Result;

pub use cache::NoteCache;
pub use http::{HttpNotesApi, DEFAULT_BASE_URL};
pub use local::LocalNotesApi;
pub use session::NotesSession;

/// CRUD contract of the notes service, independent of transport.
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// All notes, newest created first.
    async fn list(&self) -> Result<Vec<Note>>;

    async fn get(&self, id: Uuid) -> Result<Note>;

    async fn create(&self, input: NoteInput) -> Result<Note>;

    /// Full replace of title, content and group.
    async fn update(&self, id: Uuid, input: NoteInput) -> Result<Note>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
