use std::io::{self, Read};
use std::sync::Arc;

use uuid::Uuid;

use super::commands::{GlobalArgs, ServeArgs};
use crate::api;
use crate::client::{HttpNotesApi, LocalNotesApi, NotesApi, NotesSession, DEFAULT_BASE_URL};
use crate::config::ServerConfig;
use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};
use crate::prefs::{FilePreferenceStore, Preferences};
use crate::store::NoteStore;
use crate::view::{self, GroupFilter, SortMode, ViewState};

/// Open a session against the configured backend and load every note.
async fn open_session(global: &GlobalArgs) -> Result<NotesSession> {
    let api: Arc<dyn NotesApi> = match &global.database {
        Some(path) => {
            tracing::debug!(database = %path.display(), "using local database");
            Arc::new(LocalNotesApi::new(NoteStore::open(path)?))
        }
        None => {
            let url = global.server.as_deref().unwrap_or(DEFAULT_BASE_URL);
            tracing::debug!(server = url, "using notes server");
            Arc::new(HttpNotesApi::new(url))
        }
    };

    let mut session = NotesSession::new(api);
    session.refresh().await?;
    Ok(session)
}

fn open_prefs(global: &GlobalArgs) -> Preferences<FilePreferenceStore> {
    let path = global
        .prefs
        .clone()
        .unwrap_or_else(FilePreferenceStore::default_path);
    Preferences::new(FilePreferenceStore::new(path))
}

/// Mirror a note's group into the legacy index. Failures only warn; the
/// note itself is already saved.
fn sync_group_index(prefs: &mut Preferences<FilePreferenceStore>, note: &Note) {
    let result = match &note.group {
        Some(group) => prefs
            .ensure_group(group)
            .and_then(|_| prefs.add_note_to_group(note.id, group)),
        None => prefs.remove_note_from_group(&note.id),
    };
    if let Err(e) = result {
        eprintln!("Warning: failed to update group index: {}", e);
    }
}

fn print_note(note: &Note, pinned: bool) {
    println!("Note ({})", note.id);
    println!("Title: {}", note.title);
    if let Some(ref group) = note.group {
        println!("Group: {}", group);
    }
    if pinned {
        println!("Pinned: yes");
    }
    println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", note.updated_at.format("%Y-%m-%d %H:%M"));
    println!("\n{}", note.content);
}

pub async fn handle_serve(global: &GlobalArgs, args: ServeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ref database) = global.database {
        config.database = database.clone();
    }

    api::serve(config).await
}

pub async fn handle_list(
    global: &GlobalArgs,
    query: Option<String>,
    sort: String,
    group: Option<String>,
    json: bool,
) -> Result<()> {
    let sort: SortMode = sort.parse().map_err(NoteboxError::Validation)?;
    let state = ViewState {
        query: query.unwrap_or_default(),
        sort,
        group: GroupFilter::from(group),
    };

    let session = open_session(global).await?;
    let pinned = open_prefs(global).pinned_set()?;
    let notes = session.view(&state, &pinned);

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if session.cache().is_empty() {
        println!("No notes yet.");
    } else if notes.is_empty() {
        println!("No notes match the current filters.");
    } else {
        println!("Notes:\n");
        for n in notes {
            let marker = if pinned.contains(&n.id) { "*" } else { " " };
            let group = n
                .group
                .as_deref()
                .map(|g| format!("[{}] ", g))
                .unwrap_or_default();
            println!("  {} ({}) {}{}", marker, n.short_id(), group, n.title);
        }
    }

    Ok(())
}

pub async fn handle_get(global: &GlobalArgs, id: String, json: bool) -> Result<()> {
    let session = open_session(global).await?;
    let note = session.resolve(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
    } else {
        let pinned = open_prefs(global).is_pinned(&note.id)?;
        print_note(note, pinned);
    }

    Ok(())
}

pub async fn handle_add(
    global: &GlobalArgs,
    title: String,
    content: Option<String>,
    stdin: bool,
    group: Option<String>,
    json: bool,
) -> Result<()> {
    let content = if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        content.unwrap_or_default()
    };

    let mut input = NoteInput::new(title, content);
    input.group = group;

    let mut session = open_session(global).await?;
    let note = session.create(input).await?;

    if note.group.is_some() {
        sync_group_index(&mut open_prefs(global), &note);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Created note ({}) - {}", note.short_id(), note.title);
    }

    Ok(())
}

pub async fn handle_update(
    global: &GlobalArgs,
    id: String,
    title: Option<String>,
    content: Option<String>,
    group: Option<String>,
    no_group: bool,
    json: bool,
) -> Result<()> {
    let mut session = open_session(global).await?;
    let current = session.resolve(&id)?;
    let note_id = current.id;

    // full replace: unspecified fields carry over
    let mut input = NoteInput::from(current);
    if let Some(title) = title {
        input.title = title;
    }
    if let Some(content) = content {
        input.content = content;
    }
    if no_group {
        input.group = None;
    } else if group.is_some() {
        input.group = group;
    }

    let updated = session.update(note_id, input).await?;
    sync_group_index(&mut open_prefs(global), &updated);

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated note ({}) - {}", updated.short_id(), updated.title);
    }

    Ok(())
}

pub async fn handle_delete(global: &GlobalArgs, id: String, force: bool) -> Result<()> {
    let mut session = open_session(global).await?;
    let note = session.resolve(&id)?.clone();

    // Confirm deletion unless --force is used
    if !force {
        eprintln!("Delete note ({}) - {}? [y/N] ", note.short_id(), note.title);

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(NoteboxError::Validation(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    session.delete(note.id).await?;

    if let Err(e) = open_prefs(global).forget_note(&note.id) {
        eprintln!("Warning: failed to clear local preferences: {}", e);
    }

    println!("Deleted note ({}) - {}", note.short_id(), note.title);

    Ok(())
}

pub async fn handle_pin(global: &GlobalArgs, id: String) -> Result<()> {
    let session = open_session(global).await?;
    let note = session.resolve(&id)?;

    let pinned: Vec<Uuid> = open_prefs(global).toggle_pinned(note.id)?;
    let verb = if pinned.contains(&note.id) {
        "Pinned"
    } else {
        "Unpinned"
    };
    println!("{} note ({}) - {}", verb, note.short_id(), note.title);

    Ok(())
}

pub async fn handle_groups(global: &GlobalArgs) -> Result<()> {
    let session = open_session(global).await?;
    let mut names = session.cache().groups();

    // names only the legacy index still knows about
    for legacy in open_prefs(global).group_names()? {
        if !names.contains(&legacy) {
            names.push(legacy);
        }
    }
    names.sort_by(|a, b| view::locale_cmp(a, b));

    if names.is_empty() {
        println!("No groups found.");
    } else {
        for name in names {
            let count = session
                .cache()
                .notes()
                .iter()
                .filter(|n| n.group.as_deref() == Some(name.as_str()))
                .count();
            println!("  {} ({})", name, count);
        }
    }

    Ok(())
}
