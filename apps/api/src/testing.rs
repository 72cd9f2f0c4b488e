//! Test doubles for the generation service and pipeline sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::generation::orchestrator::{GenerationPhase, ToolkitSink};
use crate::llm_client::{AspectRatio, ContentGenerator, LlmError};
use crate::models::toolkit::ToolkitContent;

/// Scripted answer to one image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageReply {
    Image,
    NoImage,
    Fail,
}

/// A generator that replays a fixed content answer and a queue of image replies.
/// Image requests beyond the queue return no image.
pub struct ScriptedGenerator {
    content: Option<String>,
    images: Mutex<VecDeque<ImageReply>>,
    content_prompts: Mutex<Vec<String>>,
    image_calls: Mutex<Vec<(String, AspectRatio)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    /// `None` makes the content request come back empty.
    pub fn new(content: Option<String>) -> Self {
        Self {
            content,
            images: Mutex::new(VecDeque::new()),
            content_prompts: Mutex::new(Vec::new()),
            image_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_images(self, replies: Vec<ImageReply>) -> Self {
        *self.images.lock().unwrap() = replies.into();
        self
    }

    pub fn content_prompts(&self) -> Vec<String> {
        self.content_prompts.lock().unwrap().clone()
    }

    pub fn image_calls(&self) -> Vec<(String, AspectRatio)> {
        self.image_calls.lock().unwrap().clone()
    }

    pub fn max_concurrent_images(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate_structured(
        &self,
        prompt: &str,
        _system: &str,
        _schema: &Value,
    ) -> Result<String, LlmError> {
        self.content_prompts.lock().unwrap().push(prompt.to_string());
        self.content.clone().ok_or(LlmError::EmptyContent)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
    ) -> Result<Option<String>, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call_index = {
            let mut calls = self.image_calls.lock().unwrap();
            calls.push((prompt.to_string(), aspect));
            calls.len()
        };
        tokio::task::yield_now().await;

        let reply = self
            .images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ImageReply::NoImage);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            ImageReply::Image => Ok(Some(format!("data:image/png;base64,IMG{call_index}"))),
            ImageReply::NoImage => Ok(None),
            ImageReply::Fail => Err(LlmError::Api {
                status: 500,
                message: "image backend unavailable".to_string(),
            }),
        }
    }
}

/// Records every phase change and published toolkit.
#[derive(Default)]
pub struct RecordingSink {
    phases: Mutex<Vec<GenerationPhase>>,
    published: Mutex<Vec<ToolkitContent>>,
}

impl RecordingSink {
    pub fn phases(&self) -> Vec<GenerationPhase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<ToolkitContent> {
        self.published.lock().unwrap().clone()
    }
}

impl ToolkitSink for RecordingSink {
    fn set_phase(&self, phase: GenerationPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn publish(&self, content: &ToolkitContent) {
        self.published.lock().unwrap().push(content.clone());
    }
}
