//! HTTP API for notes.
//!
//! Routes live under `/api`:
//!
//! - `GET /api/notes` - all notes, newest first
//! - `GET /api/notes/{id}` - one note
//! - `POST /api/notes` - create
//! - `PUT /api/notes/{id}` - full replace
//! - `DELETE /api/notes/{id}` - delete

pub mod error;
pub mod handlers;
pub mod rate_limit;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{NoteboxError, Result};
use crate::store::{self, NoteStore, SharedStore};

pub use error::MessageBody;
pub use rate_limit::RateLimiter;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
}

impl AppState {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store: store::shared(store),
        }
    }
}

fn notes_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| NoteboxError::Config(format!("invalid CORS origin: {}", o)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Build the full application router.
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    Ok(Router::new()
        .nest("/api", notes_routes(state))
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins)?))
}

/// Open the database and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let store = NoteStore::open(&config.database)?;
    tracing::info!(
        database = %config.database.display(),
        notes = store.count()?,
        "database ready"
    );

    let app = router(AppState::new(store), &config)?;
    let addr = config.socket_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server started on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
