use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::llm_client::ContentGenerator;
use crate::session::{Session, SharedSession};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Generation service. Default: GeminiClient.
    pub generator: Arc<dyn ContentGenerator>,
    /// The one view session this process serves.
    pub session: SharedSession,
}

impl AppState {
    pub fn new(config: Config, generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            config,
            generator,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }
}
