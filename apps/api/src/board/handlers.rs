//! Axum route handlers for the sequencing board.
//! Each call is one UI event: drag start, drop, cancel, or reset.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::board::state::SequenceCheck;
use crate::board::{BoardView, DropOutcome, Origin};
use crate::errors::AppError;
use crate::models::toolkit::CardId;
use crate::session::lock;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BeginDragRequest {
    pub card_id: CardId,
    pub origin: Origin,
}

#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub outcome: DropOutcome,
    pub board: BoardView,
}

/// GET /api/v1/board
pub async fn handle_get_board(State(state): State<AppState>) -> Json<BoardView> {
    Json(lock(&state.session).board().view())
}

/// POST /api/v1/board/drag
pub async fn handle_begin_drag(
    State(state): State<AppState>,
    Json(request): Json<BeginDragRequest>,
) -> Result<Json<BoardView>, AppError> {
    let mut session = lock(&state.session);
    session
        .board_mut()
        .begin_drag(request.card_id, request.origin)?;
    Ok(Json(session.board().view()))
}

/// POST /api/v1/board/drop/slot/:index
pub async fn handle_drop_on_slot(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Json<DropResponse> {
    let mut session = lock(&state.session);
    let outcome = session.board_mut().drop_on_slot(index);
    Json(DropResponse {
        outcome,
        board: session.board().view(),
    })
}

/// POST /api/v1/board/drop/pool
pub async fn handle_drop_on_pool(State(state): State<AppState>) -> Json<DropResponse> {
    let mut session = lock(&state.session);
    let outcome = session.board_mut().drop_on_pool();
    Json(DropResponse {
        outcome,
        board: session.board().view(),
    })
}

/// POST /api/v1/board/cancel
pub async fn handle_cancel_drag(State(state): State<AppState>) -> Json<BoardView> {
    let mut session = lock(&state.session);
    session.board_mut().cancel_drag();
    Json(session.board().view())
}

/// POST /api/v1/board/reset
pub async fn handle_reset(State(state): State<AppState>) -> Result<Json<BoardView>, AppError> {
    let mut session = lock(&state.session);
    if session.board().is_empty() {
        return Err(AppError::NotFound("No toolkit has been generated yet".to_string()));
    }
    session.board_mut().reset();
    Ok(Json(session.board().view()))
}

/// GET /api/v1/board/check
pub async fn handle_check(State(state): State<AppState>) -> Result<Json<SequenceCheck>, AppError> {
    let session = lock(&state.session);
    if session.board().is_empty() {
        return Err(AppError::NotFound("No toolkit has been generated yet".to_string()));
    }
    Ok(Json(session.board().evaluate()))
}
