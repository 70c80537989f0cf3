use async_trait::async_trait;
use uuid::Uuid;

use super::NotesApi;
use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};
use crate::store::{self, NoteStore, SharedStore};

/// [`NotesApi`] served straight from a database, without a server.
#[derive(Clone)]
pub struct LocalNotesApi {
    store: SharedStore,
}

impl LocalNotesApi {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store: store::shared(store),
        }
    }

    pub fn from_shared(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotesApi for LocalNotesApi {
    async fn list(&self) -> Result<Vec<Note>> {
        self.store.lock().await.list()
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        self.store
            .lock()
            .await
            .get(&id)?
            .ok_or_else(|| NoteboxError::NotFound(id.to_string()))
    }

    async fn create(&self, input: NoteInput) -> Result<Note> {
        self.store.lock().await.create(input)
    }

    async fn update(&self, id: Uuid, input: NoteInput) -> Result<Note> {
        self.store.lock().await.update(&id, input)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.lock().await.delete(&id)
    }
}
