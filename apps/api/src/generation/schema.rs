//! Content schema: the strict output contract for the story request, and the
//! validation that turns a raw answer into `ToolkitContent`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm_client::LlmError;
use crate::models::toolkit::{
    CardId, Difficulty, EventCard, Inference, QuestionCategory, ToolkitContent, WhQuestion,
};

/// Number of sequence events and WH-questions in every toolkit.
pub const EVENT_COUNT: usize = 4;
pub const QUESTION_COUNT: usize = 4;

/// The structured-output schema sent with the content request.
pub fn content_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "storyText": { "type": "STRING" },
            "visualStyle": {
                "type": "STRING",
                "description": "Reusable illustration style prefix: art style, palette, and a \
                    precise description of the main character's appearance."
            },
            "questions": {
                "type": "ARRAY",
                "minItems": QUESTION_COUNT,
                "maxItems": QUESTION_COUNT,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING", "enum": ["Who", "What", "Where", "When"] },
                        "question": { "type": "STRING" },
                        "answer": { "type": "STRING" }
                    },
                    "required": ["type", "question", "answer"]
                }
            },
            "sequenceEvents": {
                "type": "ARRAY",
                "minItems": EVENT_COUNT,
                "maxItems": EVENT_COUNT,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "order": { "type": "INTEGER" },
                        "text": { "type": "STRING", "description": "Caption of at most 6 words." },
                        "imagePrompt": { "type": "STRING" }
                    },
                    "required": ["order", "text", "imagePrompt"]
                }
            },
            "inference": {
                "type": "OBJECT",
                "properties": {
                    "scenario": { "type": "STRING" },
                    "sentenceStarters": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["scenario"]
            }
        },
        "required": ["title", "storyText", "visualStyle", "questions", "sequenceEvents", "inference"]
    })
}

/// The generator's answer, before ids are assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToolkit {
    pub title: String,
    pub story_text: String,
    pub visual_style: String,
    pub questions: Vec<WhQuestion>,
    pub sequence_events: Vec<RawEvent>,
    pub inference: RawInference,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub order: u8,
    pub text: String,
    pub image_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInference {
    pub scenario: String,
}

/// Request metadata carried into the toolkit.
#[derive(Debug, Clone)]
pub struct ToolkitMeta {
    pub child_name: String,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl RawToolkit {
    /// Checks the answer against the contract and sorts events chronologically.
    pub fn validate(mut self) -> Result<Self, LlmError> {
        if self.title.trim().is_empty() {
            return Err(LlmError::Schema("title is empty".to_string()));
        }
        if self.story_text.trim().is_empty() {
            return Err(LlmError::Schema("storyText is empty".to_string()));
        }

        if self.questions.len() != QUESTION_COUNT {
            return Err(LlmError::Schema(format!(
                "expected {QUESTION_COUNT} questions, got {}",
                self.questions.len()
            )));
        }
        let categories: HashSet<QuestionCategory> =
            self.questions.iter().map(|q| q.category).collect();
        if categories.len() != QuestionCategory::ALL.len() {
            return Err(LlmError::Schema(
                "questions must cover Who, What, Where and When once each".to_string(),
            ));
        }

        if self.sequence_events.len() != EVENT_COUNT {
            return Err(LlmError::Schema(format!(
                "expected {EVENT_COUNT} sequence events, got {}",
                self.sequence_events.len()
            )));
        }
        self.sequence_events.sort_by_key(|e| e.order);
        let in_sequence = self
            .sequence_events
            .iter()
            .enumerate()
            .all(|(i, e)| usize::from(e.order) == i + 1);
        if !in_sequence {
            return Err(LlmError::Schema(format!(
                "sequence event orders must be 1..={EVENT_COUNT} without repeats"
            )));
        }

        self.questions.sort_by_key(|q| q.category);
        Ok(self)
    }

    /// Builds the toolkit, giving every event an id derived from `created_at`.
    pub fn into_content(self, meta: ToolkitMeta, created_at: DateTime<Utc>) -> ToolkitContent {
        let events = self
            .sequence_events
            .into_iter()
            .enumerate()
            .map(|(index, e)| EventCard {
                id: CardId::from_creation(created_at, index),
                order: e.order,
                text: e.text.trim().to_string(),
                image_prompt: e.image_prompt,
                image_url: None,
            })
            .collect();

        ToolkitContent {
            title: self.title.trim().to_string(),
            story_text: self.story_text,
            visual_style: self.visual_style,
            story_image_url: None,
            questions: self.questions,
            events,
            inference: Inference::new(self.inference.scenario),
            child_name: meta.child_name,
            topic: meta.topic,
            difficulty: meta.difficulty,
            generated_at: created_at,
        }
    }
}
