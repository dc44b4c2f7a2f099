//! Web Module
//!
//! One HTML page with two actions: upload voice samples, then generate
//! clips with a chosen emotion and rate. Each browser session owns its
//! own pending queue; requests of one session run one at a time.

mod page;
mod session;

pub use session::{SESSION_COOKIE, SessionStore, session_id_from_headers};

use crate::batch::{GenerateOptions, IncomingFile, Orchestrator, StatusReport};
use crate::config::Config;
use crate::speech::{Emotion, RatePercent};
use anyhow::Context;
use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Field name of the file input on the upload form.
pub const UPLOAD_FIELD: &str = "audio_files";

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: SessionStore::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateForm {
    #[serde(default)]
    emotion: String,
    #[serde(default)]
    rate: String,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Bootstrap the workspace and serve the page until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    orchestrator
        .bootstrap()
        .context("Failed to prepare working directories")?;

    let app = router(
        AppState::new(Arc::new(orchestrator)),
        config.server.max_body_bytes,
    );
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, queue, is_new) = state.sessions.resolve(session_id_from_headers(&headers)).await;
    let pending = queue.lock().await.len();
    respond(id, is_new, &StatusReport::new(), pending)
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let session = session_id_from_headers(&headers);
    let files = match read_upload(multipart).await {
        Ok(files) => files,
        Err(message) => {
            let (id, queue, is_new) = state.sessions.resolve(session).await;
            tracing::warn!("Rejected upload from session {}: {}", id, message);
            let pending = queue.lock().await.len();
            return respond(id, is_new, &StatusReport::single(message), pending);
        }
    };

    let (id, queue, is_new) = state.sessions.checkout(session).await;
    tracing::info!("Session {} uploading {} file(s)", id, files.len());
    let mut pending = queue.lock().await;
    let report = state.orchestrator.upload(&mut pending, files).await;
    let count = pending.len();
    drop(pending);
    state.sessions.release(id).await;
    respond(id, is_new, &report, count)
}

/// Collect the `audio_files` parts of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<IncomingFile>, String> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read upload: {}", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read {}: {}", file_name, e))?;
        files.push(IncomingFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    let (id, queue, is_new) = state.sessions.resolve(session_id_from_headers(&headers)).await;

    let options = match parse_generate_form(&form) {
        Ok(options) => options,
        Err(message) => {
            tracing::warn!("Rejected generate request from session {}: {}", id, message);
            let pending = queue.lock().await.len();
            return respond(id, is_new, &StatusReport::single(message), pending);
        }
    };

    tracing::info!(
        "Session {} generating: emotion={}, rate={}",
        id,
        Emotion::tag(options.emotion),
        options.rate_percent
    );
    let mut pending = queue.lock().await;
    let report = state.orchestrator.generate(&mut pending, options).await;
    let count = pending.len();
    drop(pending);
    state.sessions.release(id).await;
    respond(id, is_new, &report, count)
}

/// Validate the emotion and clamp the rate into `[-50, 50]`.
fn parse_generate_form(form: &GenerateForm) -> Result<GenerateOptions, String> {
    let emotion = Emotion::parse_optional(&form.emotion).map_err(|e| e.to_string())?;
    let raw_rate = form.rate.trim();
    let rate = if raw_rate.is_empty() {
        0
    } else {
        raw_rate
            .parse::<i64>()
            .map_err(|_| format!("Invalid rate: {}", raw_rate))?
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    };
    Ok(GenerateOptions {
        emotion,
        rate_percent: RatePercent::clamped(rate).value(),
    })
}

fn respond(id: Uuid, is_new: bool, report: &StatusReport, pending: usize) -> Response {
    let mut response = Html(page::render(report, pending)).into_response();
    if is_new {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid session cookie: {}", e),
        }
    }
    response
}
