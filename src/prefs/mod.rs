//! Client-local preferences: the pinned-note set and the legacy group index.
//!
//! Nothing here is known to the server. Values live behind a
//! [`PreferenceStore`] so tests can swap in [`MemoryPreferenceStore`].

mod store;

use std::collections::{BTreeMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::view::locale_cmp;

pub use store::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};

pub const PINNED_KEY: &str = "notes:pinned";
pub const GROUPS_KEY: &str = "note_groups_v1";

/// Group bookkeeping kept by older clients before notes carried a `group`
/// field. The note's own `group` is authoritative.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIndex {
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<Uuid>>,
    #[serde(default)]
    pub note_to_group: BTreeMap<Uuid, String>,
}

impl GroupIndex {
    fn detach(&mut self, note_id: &Uuid) {
        if let Some(prev) = self.note_to_group.remove(note_id) {
            if let Some(members) = self.groups.get_mut(&prev) {
                members.retain(|id| id != note_id);
            }
        }
    }
}

pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Read a JSON value, treating absent or unparseable data as the default.
    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(T::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "discarding malformed preference value");
            T::default()
        }))
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, serde_json::to_string(value)?)
    }

    /// Pinned ids in the order they were pinned.
    pub fn pinned_ids(&self) -> Result<Vec<Uuid>> {
        self.read(PINNED_KEY)
    }

    pub fn pinned_set(&self) -> Result<HashSet<Uuid>> {
        Ok(self.pinned_ids()?.into_iter().collect())
    }

    pub fn is_pinned(&self, id: &Uuid) -> Result<bool> {
        Ok(self.pinned_ids()?.contains(id))
    }

    /// Flip the pinned flag of `id` and return the new pinned list.
    pub fn toggle_pinned(&mut self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut pinned = self.pinned_ids()?;
        if pinned.contains(&id) {
            // older blobs may hold the same id twice
            pinned.retain(|p| *p != id);
        } else {
            pinned.push(id);
        }
        self.write(PINNED_KEY, &pinned)?;
        Ok(pinned)
    }

    pub fn group_index(&self) -> Result<GroupIndex> {
        self.read(GROUPS_KEY)
    }

    /// Names in the legacy index, sorted for display.
    pub fn group_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.group_index()?.groups.into_keys().collect();
        names.sort_by(|a, b| locale_cmp(a, b));
        Ok(names)
    }

    pub fn group_for_note(&self, id: &Uuid) -> Result<Option<String>> {
        Ok(self.group_index()?.note_to_group.remove(id))
    }

    /// Register a group name. Blank names are ignored.
    pub fn ensure_group(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let mut index = self.group_index()?;
        index.groups.entry(name.to_string()).or_default();
        self.write(GROUPS_KEY, &index)
    }

    /// Move `id` into `name`, leaving any previous group.
    pub fn add_note_to_group(&mut self, id: Uuid, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let mut index = self.group_index()?;
        index.detach(&id);
        let members = index.groups.entry(name.to_string()).or_default();
        if !members.contains(&id) {
            members.push(id);
        }
        index.note_to_group.insert(id, name.to_string());
        self.write(GROUPS_KEY, &index)
    }

    pub fn remove_note_from_group(&mut self, id: &Uuid) -> Result<()> {
        let mut index = self.group_index()?;
        index.detach(id);
        self.write(GROUPS_KEY, &index)
    }

    /// Drop every local trace of a deleted note.
    pub fn forget_note(&mut self, id: &Uuid) -> Result<()> {
        let mut pinned = self.pinned_ids()?;
        let before = pinned.len();
        pinned.retain(|p| p != id);
        if pinned.len() != before {
            self.write(PINNED_KEY, &pinned)?;
        }

        let index = self.group_index()?;
        if index.note_to_group.contains_key(id) {
            self.remove_note_from_group(id)?;
        }
        Ok(())
    }
}
