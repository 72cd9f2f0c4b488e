//! Difficulty presets. Maps the form's reading level to concrete writing instructions.

use crate::models::toolkit::Difficulty;

/// Writing constraints for one reading level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyPreset {
    pub min_words: u32,
    pub max_words: u32,
    pub sentence_style: &'static str,
    pub question_style: &'static str,
    pub inference_style: &'static str,
}

/// Returns the preset for a difficulty level.
pub fn preset(difficulty: Difficulty) -> DifficultyPreset {
    match difficulty {
        Difficulty::Easy => DifficultyPreset {
            min_words: 80,
            max_words: 120,
            sentence_style: "Short, simple sentences of 4-8 words. Mostly decodable CVC words \
                and common sight words. Repeat key words often.",
            question_style: "Literal questions answered by a single sentence of the story.",
            inference_style: "A very obvious clue; the answer is almost stated in the text.",
        },
        Difficulty::Medium => DifficultyPreset {
            min_words: 150,
            max_words: 200,
            sentence_style: "Mix of simple and compound sentences joined with 'and', 'but', \
                'so'. Include a few two-syllable words and blends.",
            question_style: "Mostly literal questions, with one question about a small detail.",
            inference_style: "A clear clue that still requires connecting two facts.",
        },
        Difficulty::Hard => DifficultyPreset {
            min_words: 250,
            max_words: 300,
            sentence_style: "Varied sentence lengths including dialogue and descriptive \
                phrases. Multi-syllable words are allowed.",
            question_style: "Detail-oriented questions that require careful rereading.",
            inference_style: "A subtle clue where the reader must use background knowledge.",
        },
    }
}

impl DifficultyPreset {
    /// Renders the preset as the instruction block embedded in the content prompt.
    pub fn instruction_block(&self) -> String {
        format!(
            "- Story length: {}-{} words.\n\
             - Sentences: {}\n\
             - Questions: {}\n\
             - Inference: {}",
            self.min_words,
            self.max_words,
            self.sentence_style,
            self.question_style,
            self.inference_style
        )
    }
}
