//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for module drafts and session dumps.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::CopilotError;
use crate::generator::{Document, ModuleRequest, DEFAULT_DOCUMENT_MIME};
use crate::orchestrator::Orchestrator;
use crate::session::DumpOptions;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings.clone())?;

    let state = Arc::new(AppState {
        orchestrator,
        settings,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/modules", post(create_module))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{session_id}/dump", get(dump_session))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Copilot API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Module draft", "POST /modules");
    Output::kv("Sessions", "GET  /sessions");
    Output::kv("Session dump", "GET  /sessions/{session_id}/dump");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct ModuleRequestBody {
    title: String,
    #[serde(default)]
    level: String,
    duration_weeks: i64,
    #[serde(default)]
    teaching_style: String,
    /// Base64-encoded curriculum document.
    #[serde(default)]
    document_base64: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl ModuleRequestBody {
    fn into_request(self) -> Result<ModuleRequest, CopilotError> {
        let document = match self.document_base64.filter(|d| !d.is_empty()) {
            Some(encoded) => Some(Document {
                data: STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| CopilotError::InvalidInput(format!("document_base64: {}", e)))?,
                mime_type: self
                    .mime_type
                    .unwrap_or_else(|| DEFAULT_DOCUMENT_MIME.to_string()),
            }),
            None => None,
        };

        Ok(ModuleRequest {
            title: self.title,
            level: self.level,
            duration_weeks: self.duration_weeks,
            teaching_style: self.teaching_style,
            document,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DumpQuery {
    #[serde(default)]
    max_chars: Option<usize>,
    #[serde(default = "default_true")]
    include_state: bool,
    #[serde(default = "default_true")]
    include_events: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct SessionInfo {
    id: String,
    created_at: String,
    updated_at: String,
    event_count: usize,
    state_keys: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP status for a library error.
fn status_for(error: &CopilotError) -> StatusCode {
    match error {
        CopilotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CopilotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        CopilotError::Generation(_) | CopilotError::Model(_) | CopilotError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: CopilotError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_module(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ModuleRequestBody>,
) -> Response {
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    match state.orchestrator.generate_module(&request).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Response {
    let session = &state.settings.session;
    match state
        .orchestrator
        .store()
        .list_sessions(&session.app_name, &session.user_id)
    {
        Ok(sessions) => Json(
            sessions
                .into_iter()
                .map(|s| SessionInfo {
                    id: s.id,
                    created_at: s.created_at.to_rfc3339(),
                    updated_at: s.updated_at.to_rfc3339(),
                    event_count: s.event_count,
                    state_keys: s.state_keys,
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn dump_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<DumpQuery>,
) -> Response {
    let options = DumpOptions {
        include_state: query.include_state,
        include_events: query.include_events,
        max_chars: query
            .max_chars
            .unwrap_or(state.settings.pipeline.dump_max_chars),
    };

    match state.orchestrator.dump_session(Some(&session_id), &options) {
        Ok(dump) => Json(dump).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_decodes_document() {
        let body: ModuleRequestBody = serde_json::from_value(serde_json::json!({
            "title": "Intro to SQL",
            "duration_weeks": 3,
            "document_base64": "JVBERi0xLjc="
        }))
        .unwrap();

        let request = body.into_request().unwrap();
        let document = request.document.unwrap();
        assert_eq!(document.data, b"%PDF-1.7");
        assert_eq!(document.mime_type, "application/pdf");
        assert_eq!(request.level, "");
    }

    #[test]
    fn test_bad_base64_is_invalid_input() {
        let body: ModuleRequestBody = serde_json::from_value(serde_json::json!({
            "title": "T",
            "duration_weeks": 1,
            "document_base64": "not base64!"
        }))
        .unwrap();

        let err = body.into_request().unwrap_err();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&CopilotError::Generation("bad json".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&CopilotError::SessionNotFound("s".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CopilotError::Session("missing db".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
