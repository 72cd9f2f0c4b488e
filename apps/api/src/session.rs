//! The single in-memory view session: current toolkit, card board, and
//! generation progress. Nothing here outlives the process.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::board::Board;
use crate::errors::AppError;
use crate::generation::orchestrator::{GenerationPhase, ToolkitSink};
use crate::llm_client::LlmError;
use crate::models::toolkit::ToolkitContent;

pub type SharedSession = Arc<Mutex<Session>>;

/// Message shown when the content phase fails. Details only go to the log.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate toolkit. Please try again.";

/// Locks the session. A panic while holding the lock leaves plain data behind,
/// so the poisoned guard is still usable.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStatus {
    pub run_id: Option<Uuid>,
    #[serde(flatten)]
    pub phase: GenerationPhase,
    pub label: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct Session {
    toolkit: Option<ToolkitContent>,
    board: Board,
    status: GenerationStatus,
}

impl Session {
    pub fn new() -> Self {
        Session {
            status: GenerationStatus {
                label: GenerationPhase::Idle.label(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn toolkit(&self) -> Option<&ToolkitContent> {
        self.toolkit.as_ref()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    /// Claims the session for a new pipeline run. Only one run may be in flight.
    /// The previous toolkit is dropped so a failed run leaves nothing displayed.
    pub fn begin_generation(&mut self, run_id: Uuid) -> Result<(), AppError> {
        if self.status.phase.is_running() {
            return Err(AppError::Conflict(
                "A toolkit is already being generated".to_string(),
            ));
        }
        self.toolkit = None;
        self.board = Board::new();
        self.status = GenerationStatus {
            run_id: Some(run_id),
            phase: GenerationPhase::Content,
            label: GenerationPhase::Content.label(),
            error: None,
            started_at: Some(Utc::now()),
        };
        Ok(())
    }

    pub fn set_phase(&mut self, phase: GenerationPhase) {
        self.status.label = phase.label();
        self.status.phase = phase;
    }

    /// Replaces the toolkit wholesale. A new card set reinitializes the board;
    /// the same card set only brings new illustrations onto the board.
    pub fn apply_toolkit(&mut self, content: &ToolkitContent) {
        if self.board.holds_same_cards(&content.events) {
            for event in &content.events {
                if let Some(url) = &event.image_url {
                    self.board.attach_illustration(&event.id, url.clone());
                }
            }
        } else {
            self.board.initialize(&content.events);
        }
        self.toolkit = Some(content.clone());
    }

    /// Records the end of a run.
    pub fn finish(&mut self, result: &Result<ToolkitContent, LlmError>) {
        match result {
            Ok(content) => {
                self.apply_toolkit(content);
                self.set_phase(GenerationPhase::Complete);
                info!("Toolkit {:?} ready", content.title);
            }
            Err(e) => {
                error!("Toolkit generation failed: {e}");
                self.toolkit = None;
                self.board = Board::new();
                self.set_phase(GenerationPhase::Failed);
                self.status.error = Some(GENERATION_FAILED_MESSAGE.to_string());
            }
        }
    }
}

/// Pipeline sink that writes progress straight into the shared session.
pub struct SessionSink {
    session: SharedSession,
}

impl SessionSink {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }
}

impl ToolkitSink for SessionSink {
    fn set_phase(&self, phase: GenerationPhase) {
        lock(&self.session).set_phase(phase);
    }

    fn publish(&self, content: &ToolkitContent) {
        lock(&self.session).apply_toolkit(content);
    }
}
