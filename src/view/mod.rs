//! Derived note list: group filter, text search, sort and pin reordering.
//!
//! Everything here is a pure function of its inputs so the list shown to
//! the user can be tested without a server or a preference store.

use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::entity::Note;

/// Ordering applied before pinned notes are lifted to the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Newest created first
    #[default]
    New,
    /// Oldest created first
    Old,
    /// Title A to Z
    Title,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::New => write!(f, "new"),
            SortMode::Old => write!(f, "old"),
            SortMode::Title => write!(f, "title"),
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" | "newest" => Ok(SortMode::New),
            "old" | "oldest" => Ok(SortMode::Old),
            "title" => Ok(SortMode::Title),
            _ => Err(format!("Invalid sort mode: {} (expected new, old or title)", s)),
        }
    }
}

/// Which group the list is narrowed to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupFilter {
    #[default]
    All,
    /// Exact, case-sensitive match on the note's group label
    Named(String),
}

impl GroupFilter {
    fn matches(&self, note: &Note) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Named(name) => note.group.as_deref() == Some(name.as_str()),
        }
    }
}

impl From<Option<String>> for GroupFilter {
    fn from(group: Option<String>) -> Self {
        group.map(GroupFilter::Named).unwrap_or_default()
    }
}

/// Transient list state chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub sort: SortMode,
    pub group: GroupFilter,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the search, sort newest first and show every group.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply the view to `notes`, lifting ids in `pinned` to the top.
    pub fn apply<'a>(&self, notes: &'a [Note], pinned: &HashSet<Uuid>) -> Vec<&'a Note> {
        let query = self.query.trim().to_lowercase();

        let mut list: Vec<&Note> = notes
            .iter()
            .filter(|n| self.group.matches(n))
            .filter(|n| query.is_empty() || matches_query(n, &query))
            .collect();

        // sort_by is stable; equal keys keep their incoming order
        match self.sort {
            SortMode::New => list.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::Old => list.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortMode::Title => list.sort_by(|a, b| locale_cmp(&a.title, &b.title)),
        }

        let (mut front, back): (Vec<&Note>, Vec<&Note>) =
            list.into_iter().partition(|n| pinned.contains(&n.id));
        front.extend(back);
        front
    }
}

/// `query` must already be trimmed and lowercased.
fn matches_query(note: &Note, query: &str) -> bool {
    note.title.to_lowercase().contains(query) || note.content.to_lowercase().contains(query)
}

/// Case-insensitive comparison; on a tie lowercase letters sort first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    fold(a).cmp(&fold(b)).then_with(|| {
        a.chars()
            .map(char::is_uppercase)
            .cmp(b.chars().map(char::is_uppercase))
    })
}

/// Distinct group labels in use, sorted for display.
pub fn groups(notes: &[Note]) -> Vec<String> {
    let mut names: Vec<String> = notes
        .iter()
        .filter_map(|n| n.group.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort_by(|a, b| locale_cmp(a, b));
    names
}
