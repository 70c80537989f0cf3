use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use uuid::Uuid;

use super::NotesApi;
use crate::api::MessageBody;
use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};

/// Default base URL, matching the default server port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";

/// [`NotesApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNotesApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotesApi {
    /// `base_url` is the API root, e.g. `http://localhost:5001/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn note_url(&self, id: Uuid) -> String {
        format!("{}/notes/{}", self.base_url, id)
    }
}

/// Map a non-success response onto the error taxonomy.
async fn check(response: Response, id: Option<Uuid>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let message = response
        .json::<MessageBody>()
        .await
        .map(|body| body.message)
        .unwrap_or_else(|_| status.to_string());

    tracing::debug!(%status, %message, "request rejected");

    Err(match status {
        StatusCode::BAD_REQUEST => NoteboxError::Validation(message),
        StatusCode::NOT_FOUND => {
            NoteboxError::NotFound(id.map(|id| id.to_string()).unwrap_or(message))
        }
        StatusCode::TOO_MANY_REQUESTS => NoteboxError::RateLimited { retry_after_secs },
        _ => NoteboxError::Internal(format!("server returned {}: {}", status, message)),
    })
}

#[async_trait]
impl NotesApi for HttpNotesApi {
    async fn list(&self) -> Result<Vec<Note>> {
        let response = self.client.get(self.notes_url()).send().await?;
        Ok(check(response, None).await?.json().await?)
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        let response = self.client.get(self.note_url(id)).send().await?;
        Ok(check(response, Some(id)).await?.json().await?)
    }

    async fn create(&self, input: NoteInput) -> Result<Note> {
        let response = self
            .client
            .post(self.notes_url())
            .json(&input)
            .send()
            .await?;
        Ok(check(response, None).await?.json().await?)
    }

    async fn update(&self, id: Uuid, input: NoteInput) -> Result<Note> {
        let response = self
            .client
            .put(self.note_url(id))
            .json(&input)
            .send()
            .await?;
        Ok(check(response, Some(id)).await?.json().await?)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let response = self.client.delete(self.note_url(id)).send().await?;
        check(response, Some(id)).await?;
        Ok(())
    }
}
