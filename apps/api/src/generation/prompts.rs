// All prompt text for the toolkit pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::generation::difficulty::preset;
use crate::llm_client::prompts::CHARACTER_CONSISTENCY;
use crate::models::toolkit::{Difficulty, EventCard};

/// Characters of story text quoted in the hero illustration prompt.
pub const HERO_EXCERPT_CHARS: usize = 200;

/// Content prompt template.
/// Replace: {child_name}, {topic}, {difficulty}, {difficulty_instructions}
pub const CONTENT_PROMPT_TEMPLATE: &str = r#"Create a reading toolkit for an early-elementary student.

Student name (use as the main character): {child_name}
Topic: {topic}
Reading level: {difficulty}

READING LEVEL INSTRUCTIONS:
{difficulty_instructions}

Produce:
1. "title": a short, friendly story title.
2. "storyText": a decodable story about the topic starring the student. Separate paragraphs with a blank line.
3. "visualStyle": one reusable illustration style description. Name the art style and palette, and describe the main character's exact appearance (age, hair, skin tone, clothing) so every illustration matches.
4. "questions": exactly 4 comprehension questions, one each of type "Who", "What", "Where" and "When", each with its answer.
5. "sequenceEvents": exactly 4 key events in story order, "order" 1 to 4. "text" is a caption of at most 6 words. "imagePrompt" describes the scene for an illustrator, without restating the art style.
6. "inference": a short "scenario" that is NOT stated in the story, which the student explains using clues. The sentence starters are "I think..." and "Because...".

HARD RULES:
1. Age-appropriate, positive content only.
2. Every question must be answerable from the story text.
3. Captions must be in the same order as they happen in the story."#;

/// Builds the content prompt for one request.
pub fn build_content_prompt(child_name: &str, topic: &str, difficulty: Difficulty) -> String {
    CONTENT_PROMPT_TEMPLATE
        .replace("{child_name}", child_name)
        .replace("{topic}", topic)
        .replace("{difficulty}", difficulty.label())
        .replace(
            "{difficulty_instructions}",
            &preset(difficulty).instruction_block(),
        )
}

/// Establishing-shot prompt for the story's hero illustration.
pub fn build_hero_prompt(visual_style: &str, story_text: &str) -> String {
    format!(
        "{visual_style}\n\nWide establishing shot that introduces the main character and the \
         setting of this story: \"{}\"\n\n{CHARACTER_CONSISTENCY}",
        story_excerpt(story_text, HERO_EXCERPT_CHARS)
    )
}

/// Illustration prompt for one sequence card.
pub fn build_event_prompt(visual_style: &str, event: &EventCard) -> String {
    format!(
        "{visual_style}\n\nScene: {}\n\n{CHARACTER_CONSISTENCY}",
        event.image_prompt
    )
}

/// The first `max_chars` characters of the story, on a char boundary.
pub fn story_excerpt(story_text: &str, max_chars: usize) -> &str {
    let text = story_text.trim();
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
