//! Axum route handlers for the Toolkit API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::board::BoardView;
use crate::errors::AppError;
use crate::generation::orchestrator::run_pipeline;
use crate::models::toolkit::{ToolkitContent, ToolkitRequest};
use crate::session::{lock, GenerationStatus, SessionSink};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CurrentToolkitResponse {
    pub status: GenerationStatus,
    pub toolkit: Option<ToolkitContent>,
    pub board: BoardView,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/toolkits
///
/// Validates the form and starts the generation pipeline in the background.
/// Poll /api/v1/toolkits/status or /current for progress.
pub async fn handle_create_toolkit(
    State(state): State<AppState>,
    Json(request): Json<ToolkitRequest>,
) -> Result<(StatusCode, Json<GenerationStatus>), AppError> {
    if request.topic().is_empty() {
        return Err(AppError::Validation("topic cannot be empty".to_string()));
    }

    let run_id = Uuid::new_v4();
    let status = {
        let mut session = lock(&state.session);
        session.begin_generation(run_id)?;
        session.status().clone()
    };
    info!("[{run_id}] Toolkit requested for topic {:?}", request.topic());

    tokio::spawn(async move {
        let sink = SessionSink::new(state.session.clone());
        let result = run_pipeline(
            state.generator.as_ref(),
            &request,
            &state.config.default_child_name,
            run_id,
            &sink,
        )
        .await;
        lock(&state.session).finish(&result);
    });

    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// GET /api/v1/toolkits/current
pub async fn handle_get_current(State(state): State<AppState>) -> Json<CurrentToolkitResponse> {
    let session = lock(&state.session);
    Json(CurrentToolkitResponse {
        status: session.status().clone(),
        toolkit: session.toolkit().cloned(),
        board: session.board().view(),
    })
}

/// GET /api/v1/toolkits/status
pub async fn handle_get_status(State(state): State<AppState>) -> Json<GenerationStatus> {
    Json(lock(&state.session).status().clone())
}
