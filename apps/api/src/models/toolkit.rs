use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reading level preset chosen on the request form. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The four WH-question categories. Every toolkit carries one question per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionCategory {
    Who,
    What,
    Where,
    When,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 4] = [
        QuestionCategory::Who,
        QuestionCategory::What,
        QuestionCategory::Where,
        QuestionCategory::When,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QuestionCategory::Who => "Who",
            QuestionCategory::What => "What",
            QuestionCategory::Where => "Where",
            QuestionCategory::When => "When",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhQuestion {
    #[serde(rename = "type")]
    pub category: QuestionCategory,
    pub question: String,
    pub answer: String,
}

/// Stable identifier of a sequence card. Assigned once at creation, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Builds an id from the creation timestamp and the card's position in the batch.
    pub fn from_creation(created_at: DateTime<Utc>, index: usize) -> Self {
        CardId(format!("evt-{}-{}", created_at.timestamp_millis(), index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        CardId(s.to_string())
    }
}

/// One story event of the sequencing activity.
///
/// Everything but `image_url` is fixed at creation. The illustration moves from
/// absent to present at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCard {
    pub id: CardId,
    /// Chronological rank in the story, 1-based.
    pub order: u8,
    pub text: String,
    pub image_prompt: String,
    pub image_url: Option<String>,
}

impl EventCard {
    /// Sets the illustration if none is present yet. Returns whether it was set.
    pub fn attach_illustration(&mut self, url: String) -> bool {
        if self.image_url.is_some() {
            return false;
        }
        self.image_url = Some(url);
        true
    }
}

pub const SENTENCE_STARTERS: [&str; 2] = ["I think...", "Because..."];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub scenario: String,
    pub sentence_starters: [String; 2],
}

impl Inference {
    pub fn new(scenario: String) -> Self {
        Inference {
            scenario,
            sentence_starters: SENTENCE_STARTERS.map(str::to_string),
        }
    }
}

/// The full generated worksheet set for one request.
/// Replaced wholesale by each new generation; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitContent {
    pub title: String,
    pub story_text: String,
    /// Illustration style prefix reused verbatim in every image prompt.
    pub visual_style: String,
    pub story_image_url: Option<String>,
    pub questions: Vec<WhQuestion>,
    /// Sequence events in chronological order.
    pub events: Vec<EventCard>,
    pub inference: Inference,
    pub child_name: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub generated_at: DateTime<Utc>,
}

/// Request form for a new toolkit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolkitRequest {
    #[serde(default)]
    pub child_name: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl ToolkitRequest {
    /// Trimmed topic; empty means the form is invalid.
    pub fn topic(&self) -> &str {
        self.topic.trim()
    }

    /// The child's name, falling back to `default` when blank or absent.
    pub fn child_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.child_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(default)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty.unwrap_or_default()
    }
}
