//! Axum route handlers for rendered sheets.

use axum::{extract::State, response::Html, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::render::{render_toolkit, RenderMode};
use crate::session::lock;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// GET /api/v1/toolkits/current/sheets
///
/// Interactive rendering: live board, answer key, and controls marked `no-print`.
pub async fn handle_sheets(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let session = lock(&state.session);
    let toolkit = session.toolkit().ok_or_else(no_toolkit)?;
    Ok(Html(render_toolkit(
        toolkit,
        session.board(),
        RenderMode::Interactive,
    )))
}

/// POST /api/v1/toolkits/current/print
///
/// Requires `confirm: true`. Reshuffles the sequence cards back into the pool so
/// the printed sheet is unsorted, then returns the print rendering.
pub async fn handle_print(
    State(state): State<AppState>,
    Json(request): Json<PrintRequest>,
) -> Result<Html<String>, AppError> {
    if !request.confirm {
        return Err(AppError::Validation(
            "Printing resets the sequence cards and must be confirmed".to_string(),
        ));
    }

    let mut session = lock(&state.session);
    if session.toolkit().is_none() {
        return Err(no_toolkit());
    }
    session.board_mut().reset();
    info!("Board reset for printing");

    let toolkit = session.toolkit().ok_or_else(no_toolkit)?;
    Ok(Html(render_toolkit(
        toolkit,
        session.board(),
        RenderMode::Print,
    )))
}

fn no_toolkit() -> AppError {
    AppError::NotFound("No toolkit has been generated yet".to_string())
}
