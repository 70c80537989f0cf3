mod sqlite_store;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use sqlite_store::NoteStore;

/// Store handle shared between request handlers.
pub type SharedStore = Arc<Mutex<NoteStore>>;

pub fn shared(store: NoteStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}
