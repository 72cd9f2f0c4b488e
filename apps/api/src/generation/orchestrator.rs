//! Toolkit pipeline: orchestrates the three generation phases.
//!
//! Flow: content (fatal on failure) → hero illustration → one illustration per
//! sequence event, strictly one request at a time.
//!
//! Illustration failures are logged and leave the image unset; they never abort
//! the run. Progress and partial toolkits are pushed through `ToolkitSink` so the
//! view can render before every illustration is ready.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::generation::prompts::{build_content_prompt, build_event_prompt, build_hero_prompt};
use crate::generation::schema::{content_response_schema, RawToolkit, ToolkitMeta};
use crate::llm_client::prompts::LITERACY_SYSTEM;
use crate::llm_client::{generate_json, AspectRatio, ContentGenerator, LlmError};
use crate::models::toolkit::{ToolkitContent, ToolkitRequest};

// ────────────────────────────────────────────────────────────────────────────
// Progress
// ────────────────────────────────────────────────────────────────────────────

/// Where the pipeline currently is, for progress display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GenerationPhase {
    #[default]
    Idle,
    Content,
    HeroIllustration,
    SequenceIllustration {
        current: usize,
        total: usize,
    },
    Complete,
    Failed,
}

impl GenerationPhase {
    /// Human-readable label shown on the generate button.
    pub fn label(&self) -> String {
        match self {
            GenerationPhase::Idle => "Create Toolkit".to_string(),
            GenerationPhase::Content => "Writing story...".to_string(),
            GenerationPhase::HeroIllustration => "Painting cover...".to_string(),
            GenerationPhase::SequenceIllustration { current, total } => {
                format!("Card {current}/{total}")
            }
            GenerationPhase::Complete => "Done".to_string(),
            GenerationPhase::Failed => "Failed".to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self,
            GenerationPhase::Content
                | GenerationPhase::HeroIllustration
                | GenerationPhase::SequenceIllustration { .. }
        )
    }
}

/// Receives progress from a running pipeline.
pub trait ToolkitSink: Send + Sync {
    fn set_phase(&self, phase: GenerationPhase);

    /// Called with the whole toolkit each time it changes.
    fn publish(&self, content: &ToolkitContent);
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full pipeline and returns the final toolkit.
///
/// Only the content phase can fail the run. A blank child name falls back to
/// `default_child_name`.
pub async fn run_pipeline(
    generator: &dyn ContentGenerator,
    request: &ToolkitRequest,
    default_child_name: &str,
    run_id: Uuid,
    sink: &dyn ToolkitSink,
) -> Result<ToolkitContent, LlmError> {
    let child_name = request.child_name_or(default_child_name).to_string();
    let topic = request.topic().to_string();
    let difficulty = request.difficulty();

    // Phase 1: story content
    sink.set_phase(GenerationPhase::Content);
    info!("[{run_id}] Generating content: topic={topic:?}, difficulty={difficulty}");

    let prompt = build_content_prompt(&child_name, &topic, difficulty);
    let raw: RawToolkit =
        generate_json(generator, &prompt, LITERACY_SYSTEM, &content_response_schema()).await?;
    let raw = raw.validate()?;

    // Phase 2: ids are assigned here, not by the generator
    let mut content = raw.into_content(
        ToolkitMeta {
            child_name,
            topic,
            difficulty,
        },
        Utc::now(),
    );
    info!(
        "[{run_id}] Content ready: {:?} with {} events",
        content.title,
        content.events.len()
    );
    sink.publish(&content);

    // Phase 3: hero illustration
    sink.set_phase(GenerationPhase::HeroIllustration);
    let hero_prompt = build_hero_prompt(&content.visual_style, &content.story_text);
    match generator
        .generate_image(&hero_prompt, AspectRatio::Landscape)
        .await
    {
        Ok(Some(url)) => content.story_image_url = Some(url),
        Ok(None) => warn!("[{run_id}] Hero illustration returned no image"),
        Err(e) => warn!("[{run_id}] Hero illustration failed: {e}"),
    }
    sink.publish(&content);

    // Phase 4: one illustration per event, in story order, one request at a time
    let total = content.events.len();
    for index in 0..total {
        sink.set_phase(GenerationPhase::SequenceIllustration {
            current: index + 1,
            total,
        });

        let event_prompt = build_event_prompt(&content.visual_style, &content.events[index]);
        match generator
            .generate_image(&event_prompt, AspectRatio::Square)
            .await
        {
            Ok(Some(url)) => {
                content.events[index].attach_illustration(url);
            }
            Ok(None) => warn!(
                "[{run_id}] Illustration for card {}/{total} returned no image",
                index + 1
            ),
            Err(e) => warn!(
                "[{run_id}] Illustration for card {}/{total} failed: {e}",
                index + 1
            ),
        }
        sink.publish(&content);
    }

    let illustrated = content.events.iter().filter(|e| e.image_url.is_some()).count();
    info!(
        "[{run_id}] Toolkit complete: hero={}, cards illustrated {illustrated}/{total}",
        content.story_image_url.is_some()
    );

    Ok(content)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
