//! HTTP server: the browser UI and the JSON API behind it.
//!
//! Each browser tab creates its own session and passes the id on every
//! call. The three views of the UI map onto these endpoints:
//!
//! - Chat: `setup` (upload + key) and `chat` (one turn)
//! - Logs: `logs` (structured + raw, on refresh)
//! - Raw View: the `raw_stream` returned by every `chat` call

pub mod state;

use crate::config::Config;
use crate::pdf::pdf_supported;
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use colored::Colorize;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use state::{AppState, SessionHandle, SharedState};

/// Upload form: the PDF as base64 plus the API key.
#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    pub file_name: Option<String>,
    pub pdf_base64: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn find_session(state: &SharedState, id: &Uuid) -> Result<SessionHandle, Response> {
    state
        .session(id)
        .await
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Session not found"))
}

/// Build the router. Split out from [`run_server`] so tests can drive it.
pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/info", get(info))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/setup", post(setup))
        .route("/sessions/:id/chat", post(chat))
        .route("/sessions/:id/logs", get(logs))
        .route("/sessions/:id/logs/view", get(logs_view));

    Router::new()
        .route("/", get(|| async { Html(include_str!("../../web/index.html")) }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn info(State(state): State<SharedState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "model": state.factory.model_id(),
            "binding": state.factory.binding(),
            "pdf_support": pdf_supported(),
            "sessions": state.session_count().await,
        })),
    )
        .into_response()
}

async fn create_session(State(state): State<SharedState>) -> Response {
    let handle = state.create_session().await;
    let summary = handle.lock().await.summary();
    (StatusCode::CREATED, Json(json!(summary))).into_response()
}

async fn get_session(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    match find_session(&state, &id).await {
        Ok(handle) => (StatusCode::OK, Json(json!(handle.lock().await.summary()))).into_response(),
        Err(resp) => resp,
    }
}

async fn delete_session(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    if state.remove_session(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Session not found")
    }
}

async fn setup(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetupRequest>,
) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    if let Some(name) = payload.file_name.as_deref() {
        if !name.is_empty() && !name.to_lowercase().ends_with(".pdf") {
            return error_response(StatusCode::BAD_REQUEST, "Only .pdf files are accepted");
        }
    }

    let file = match payload.pdf_base64.as_deref().filter(|s| !s.is_empty()) {
        Some(encoded) => match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to decode base64 upload: {}", e),
                )
            }
        },
        None => None,
    };

    let api_key = payload.api_key.unwrap_or_default();
    let mut session = handle.lock().await;
    let status = session.setup(file, &api_key, state.factory.as_ref()).await;

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "stage": session.stage(),
        })),
    )
        .into_response()
}

async fn chat(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    let outcome = handle.lock().await.ask(&payload.message).await;
    (StatusCode::OK, Json(json!(outcome))).into_response()
}

async fn logs(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    let session = handle.lock().await;
    (
        StatusCode::OK,
        Json(json!({
            "structured": session.structured_logs(),
            "raw": session.raw_logs(),
        })),
    )
        .into_response()
}

async fn logs_view(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    let view = handle.lock().await.fallback_log_view();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        view,
    )
        .into_response()
}

/// Run the HTTP server
pub async fn run_server(config: &Config, state: SharedState) -> Result<()> {
    let port = config.port;
    let app = router(state.clone(), config.max_upload_bytes());

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            eprintln!("\n{} Port {} is already in use.\n", "Error:".red(), port);
            eprintln!("Try a different port with:");
            eprintln!("  {}\n", "pdf-chat serve --port <PORT>".cyan());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Server running on http://localhost:{}", port);
    println!("Model:           {} ({})", state.factory.model_id(), state.factory.binding().name());
    println!("Contract:        {}", state.contract.path().display());
    println!("\nAPI Endpoints:");
    println!("  GET    /health                      - Health check");
    println!("  GET    /api/info                    - Model and build info");
    println!("  POST   /api/sessions                - Start a session");
    println!("  GET    /api/sessions/:id            - Session status");
    println!("  DELETE /api/sessions/:id            - End a session");
    println!("  POST   /api/sessions/:id/setup      - Upload PDF and API key");
    println!("  POST   /api/sessions/:id/chat       - Ask a question");
    println!("  GET    /api/sessions/:id/logs       - Structured and raw logs");
    println!("  GET    /api/sessions/:id/logs/view  - Plain-text log view");

    axum::serve(listener, app).await?;
    Ok(())
}
