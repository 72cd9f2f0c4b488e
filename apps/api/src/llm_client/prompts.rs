// Shared prompt fragments used by more than one generation phase.
// Phase-specific prompts live in generation/prompts.rs.

/// System role for the structured story request.
pub const LITERACY_SYSTEM: &str = "You are an expert early-elementary literacy teacher and \
    children's author. You write decodable, age-appropriate stories and matching \
    comprehension activities. \
    You MUST respond with valid JSON only, matching the provided schema. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Appended to every illustration prompt so the same character looks the same on every card.
pub const CHARACTER_CONSISTENCY: &str = "Keep the main character's appearance, clothing, \
    colors and proportions exactly the same as in the other illustrations. \
    No text, letters or words in the image.";
