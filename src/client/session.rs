use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{NoteCache, NotesApi};
use crate::autosave::{AutosaveEvent, AutosaveHandle};
use crate::entity::{Note, NoteInput};
use crate::error::Result;
use crate::view::ViewState;

/// A client's view of the notes service: the API plus the cache it keeps
/// in step with it.
///
/// The cache only changes after the API confirms a mutation; a failed call
/// leaves it untouched so the caller can retry with the same draft.
pub struct NotesSession {
    api: Arc<dyn NotesApi>,
    cache: NoteCache,
}

impl NotesSession {
    pub fn new(api: Arc<dyn NotesApi>) -> Self {
        Self {
            api,
            cache: NoteCache::new(),
        }
    }

    pub fn cache(&self) -> &NoteCache {
        &self.cache
    }

    /// Reload every note from the API.
    pub async fn refresh(&mut self) -> Result<&[Note]> {
        let notes = self.api.list().await?;
        tracing::debug!(count = notes.len(), "notes loaded");
        self.cache.replace_all(notes);
        Ok(self.cache.notes())
    }

    pub async fn create(&mut self, input: NoteInput) -> Result<Note> {
        let note = self.api.create(input).await?;
        self.cache.apply_created(note.clone());
        Ok(note)
    }

    pub async fn update(&mut self, id: Uuid, input: NoteInput) -> Result<Note> {
        let note = self.api.update(id, input).await?;
        self.cache.apply_updated(note.clone());
        Ok(note)
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        self.api.delete(id).await?;
        self.cache.apply_deleted(&id);
        Ok(())
    }

    /// Cached notes after filtering, sorting and pinning.
    pub fn view(&self, state: &ViewState, pinned: &HashSet<Uuid>) -> Vec<&Note> {
        state.apply(self.cache.notes(), pinned)
    }

    pub fn resolve(&self, id: &str) -> Result<&Note> {
        self.cache.resolve(id)
    }

    /// Start autosaving edits of `note` through this session's API.
    ///
    /// The CLI performs one-shot updates and never edits interactively; this
    /// is the entry point for editor front ends embedding the library. Feed
    /// each [`AutosaveEvent`] back through [`apply_autosave`](Self::apply_autosave).
    pub fn autosave(&self, note: &Note, debounce: Duration) -> AutosaveHandle {
        AutosaveHandle::spawn(Arc::clone(&self.api), note, debounce)
    }

    /// Fold an autosave result into the cache.
    pub fn apply_autosave(&mut self, event: &AutosaveEvent) {
        if let AutosaveEvent::Saved(note) = event {
            self.cache.apply_updated(note.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalNotesApi;
    use crate::error::NoteboxError;
    use crate::store::NoteStore;
    use async_trait::async_trait;

    fn session() -> NotesSession {
        let api = LocalNotesApi::new(NoteStore::open_in_memory().unwrap());
        NotesSession::new(Arc::new(api))
    }

    /// Every call fails as if the server were down.
    struct DownApi;

    #[async_trait]
    impl NotesApi for DownApi {
        async fn list(&self) -> Result<Vec<Note>> {
            Err(NoteboxError::Internal("down".into()))
        }
        async fn get(&self, _id: Uuid) -> Result<Note> {
            Err(NoteboxError::Internal("down".into()))
        }
        async fn create(&self, _input: NoteInput) -> Result<Note> {
            Err(NoteboxError::RateLimited {
                retry_after_secs: None,
            })
        }
        async fn update(&self, _id: Uuid, _input: NoteInput) -> Result<Note> {
            Err(NoteboxError::Internal("down".into()))
        }
        async fn delete(&self, _id: Uuid) -> Result<()> {
            Err(NoteboxError::Internal("down".into()))
        }
    }

    #[tokio::test]
    async fn test_mutations_patch_cache() {
        let mut session = session();

        let a = session.create(NoteInput::new("a", "x")).await.unwrap();
        let b = session.create(NoteInput::new("b", "y")).await.unwrap();
        assert_eq!(session.cache().len(), 2);

        let updated = session
            .update(a.id, NoteInput::new(" a2 ", "x2"))
            .await
            .unwrap();
        // server-trimmed record, not the draft
        assert_eq!(session.cache().get(&a.id).unwrap().title, "a2");
        assert_eq!(session.cache().get(&a.id), Some(&updated));

        session.delete(b.id).await.unwrap();
        assert!(session.cache().get(&b.id).is_none());

        let again = session.delete(b.id).await;
        assert!(matches!(again, Err(NoteboxError::NotFound(_))));
        assert_eq!(session.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_orders_newest_first() {
        let mut session = session();
        let a = session.create(NoteInput::new("a", "x")).await.unwrap();
        let b = session.create(NoteInput::new("b", "x")).await.unwrap();

        let notes = session.refresh().await.unwrap();
        let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_failed_mutations_leave_cache_alone() {
        let mut seeded = session();
        let kept = seeded.create(NoteInput::new("kept", "x")).await.unwrap();

        let mut session = NotesSession::new(Arc::new(DownApi));
        session.cache.replace_all(vec![kept.clone()]);

        let created = session.create(NoteInput::new("new", "x")).await;
        assert!(matches!(created, Err(NoteboxError::RateLimited { .. })));
        assert!(session
            .update(kept.id, NoteInput::new("x", "y"))
            .await
            .is_err());
        assert!(session.delete(kept.id).await.is_err());
        assert!(session.refresh().await.is_err());

        assert_eq!(session.cache().notes(), &[kept]);
    }

    #[tokio::test]
    async fn test_view_uses_cache() {
        let mut session = session();
        let a = session
            .create(NoteInput::new("alpha", "x").with_group("g"))
            .await
            .unwrap();
        session.create(NoteInput::new("beta", "x")).await.unwrap();

        let state = ViewState {
            query: "ALP".to_string(),
            ..ViewState::default()
        };
        let list = session.view(&state, &HashSet::new());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, a.id);
        assert_eq!(session.cache().groups(), vec!["g".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_autosave_updates_cache() {
        let mut session = session();
        let note = session.create(NoteInput::new("a", "x")).await.unwrap();

        let mut saved = note.clone();
        saved.content = "autosaved".to_string();
        session.apply_autosave(&AutosaveEvent::Saved(saved.clone()));
        assert_eq!(session.cache().get(&note.id), Some(&saved));

        session.apply_autosave(&AutosaveEvent::Deferred);
        assert_eq!(session.cache().get(&note.id), Some(&saved));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_through_session() {
        let mut session = session();
        let note = session.create(NoteInput::new("a", "x")).await.unwrap();

        let mut handle = session.autosave(&note, Duration::from_millis(100));
        handle.edit(NoteInput::new("a", "edited ")).unwrap();

        let event = handle.next_event().await.unwrap();
        session.apply_autosave(&event);
        assert_eq!(session.cache().get(&note.id).unwrap().content, "edited");

        handle.shutdown().await;
    }
}
