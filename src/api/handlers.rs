use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::error::MessageBody;
use super::AppState;
use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};

/// Ids that are not UUIDs cannot name a note.
fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| NoteboxError::NotFound(raw.to_string()))
}

fn parse_body(payload: std::result::Result<Json<NoteInput>, JsonRejection>) -> Result<NoteInput> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| NoteboxError::Validation(rejection.body_text()))
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>> {
    let store = state.store.lock().await;
    Ok(Json(store.list()?))
}

pub async fn get_note(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Note>> {
    let id = parse_id(&id)?;
    let store = state.store.lock().await;
    store
        .get(&id)?
        .map(Json)
        .ok_or_else(|| NoteboxError::NotFound(id.to_string()))
}

pub async fn create_note(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NoteInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>)> {
    let input = parse_body(payload)?;
    let store = state.store.lock().await;
    let note = store.create(input)?;
    tracing::info!(id = %note.id, "created note");
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<NoteInput>, JsonRejection>,
) -> Result<Json<Note>> {
    let id = parse_id(&id)?;
    let input = parse_body(payload)?;
    let store = state.store.lock().await;
    let note = store.update(&id, input)?;
    tracing::info!(%id, "updated note");
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>> {
    let id = parse_id(&id)?;
    let store = state.store.lock().await;
    store.delete(&id)?;
    tracing::info!(%id, "deleted note");
    Ok(Json(MessageBody::new("Note deleted successfully")))
}
