//! JSON HTTP server.
//!
//! A thin wrapper over [`Snapshot`]: it parses request parameters, runs the
//! query on the blocking pool, and serializes the response. No matching
//! logic lives here.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=&filter=` | Query all sources; `filter` is `all`, `entities`, `metrics` or `documents` |
//! | `GET`  | `/files/{entity_id}/{filename}` | Download a stored document |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: S1/cv.pdf" } }
//! ```
//!
//! Error codes: `not_found` (404), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::filter::Category;
use crate::snapshot::{QueryResponse, Snapshot};

/// Starts the server on `[server].bind` and runs until the process stops.
pub async fn run_server(snapshot: Arc<Snapshot>) -> anyhow::Result<()> {
    let bind_addr = snapshot.config().server.bind.clone();
    let app = router(snapshot);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(snapshot: Arc<Snapshot>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/files/{entity_id}/{filename}", get(handle_file))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(snapshot)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    filter: String,
}

/// Unknown filters fall back to `all`; a missing query returns empty results.
async fn handle_search(
    State(snapshot): State<Arc<Snapshot>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryResponse>, AppError> {
    let category = Category::parse_lenient(&params.filter);
    let response =
        tokio::task::spawn_blocking(move || snapshot.handle_query(&params.q, category))
            .await
            .map_err(|e| internal(format!("search task failed: {}", e)))?;
    Ok(Json(response))
}

// ============ GET /files/{entity_id}/{filename} ============

async fn handle_file(
    State(snapshot): State<Arc<Snapshot>>,
    Path((entity_id, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let path = snapshot
        .resolve_document_path(&entity_id, &filename)
        .map_err(|e| not_found(e.to_string()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| internal(format!("failed to read {}: {}", path.display(), e)))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace(['"', '\\'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
