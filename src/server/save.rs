//! Development save server: receives mirrored snapshots and keeps the latest
//! one on disk.
//!
//! - `POST /save-json` wraps the body as `{ savedAt, payload }` and overwrites
//!   the output file with it.
//! - `GET /ping` answers `{ ok: true }`.

use crate::config::SaveServerConfig;
use crate::core::{Result as StoreResult, StoreError};
use crate::web::{Result, WebError};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, event};

#[derive(Clone)]
struct SaveState {
    out_file: Arc<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAck {
    pub ok: bool,
    pub path: String,
}

/// File layout written by the save endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSnapshot {
    pub saved_at: String,
    pub payload: Value,
}

pub fn router(config: &SaveServerConfig) -> Router {
    let state = SaveState {
        out_file: Arc::new(config.out_file.clone()),
    };
    Router::new()
        .route("/save-json", post(save_json))
        .route("/ping", get(ping))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(config: SaveServerConfig, shutdown: F) -> StoreResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| StoreError::IoError(format!("Failed to bind {}: {}", config.bind_addr, e)))?;

    event!(
        Level::INFO,
        bind_addr = %config.bind_addr,
        out_file = %config.out_file.display(),
        "save server listening"
    );

    axum::serve(listener, router(&config))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| StoreError::IoError(format!("Save server error: {}", e)))
}

async fn save_json(State(state): State<SaveState>, Json(payload): Json<Value>) -> Result<Json<SaveAck>> {
    if !payload.is_object() {
        return Err(WebError::Input("payload must be a JSON object".to_string()));
    }

    let saved = SavedSnapshot {
        saved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        payload,
    };
    let bytes = serde_json::to_vec_pretty(&saved).map_err(StoreError::from)?;

    let out_file = Arc::clone(&state.out_file);
    let len = bytes.len();
    let written = tokio::task::spawn_blocking(move || write_replacing(&out_file, &bytes))
        .await
        .map_err(|e| WebError::Internal(format!("Snapshot writer task failed: {}", e)))?;
    if let Err(err) = written {
        event!(Level::ERROR, error = %err, "error saving snapshot");
        return Err(err.into());
    }
    event!(Level::INFO, path = %state.out_file.display(), bytes = len, "saved snapshot");

    Ok(Json(SaveAck {
        ok: true,
        path: state.out_file.display().to_string(),
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "ok": true }))
}

// Stages into a private temp file next to `path`; the last rename wins.
fn write_replacing(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::IoError(format!("Failed to create output directory: {}", e))
            })?;
            parent
        }
        None => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| StoreError::IoError(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(bytes)
        .map_err(|e| StoreError::IoError(format!("Failed to write temp file: {}", e)))?;
    temp.flush()
        .map_err(|e| StoreError::IoError(format!("Failed to flush temp file: {}", e)))?;
    temp.persist(path)
        .map_err(|e| StoreError::IoError(format!("Failed to replace output file: {}", e)))?;
    Ok(())
}
