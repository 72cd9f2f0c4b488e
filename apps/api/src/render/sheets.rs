//! Sheet rendering for the story, questions, sequence board and inference board.
//!
//! Every piece of generated text passes through `html_escape` before it is
//! written. Missing illustrations render as a placeholder box.

use std::fmt::Write;

use crate::board::{Board, SLOT_COUNT};
use crate::models::toolkit::{EventCard, ToolkitContent, WhQuestion};

/// Interactive view shows the live board and teacher-only extras; print view
/// shows cut-out cards and empty slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Interactive,
    Print,
}

const PLACEHOLDER: &str = "Generating illustration...";

const STYLESHEET: &str = r#"
body { font-family: "Andika", "Comic Sans MS", sans-serif; background: #e5e7eb; margin: 0; }
.toolbar { padding: 12px; text-align: center; }
.sheet { background: #fff; width: 8.5in; min-height: 11in; margin: 16px auto; padding: 0.6in;
         box-sizing: border-box; box-shadow: 0 2px 8px rgba(0,0,0,0.2); page-break-after: always; }
.name-line { display: flex; justify-content: space-between; font-size: 14pt; margin-bottom: 16px; }
h1 { text-align: center; font-size: 26pt; }
h2 { font-size: 20pt; border-bottom: 2px solid #333; }
.story p { font-size: 18pt; line-height: 1.8; }
.hero img { width: 100%; border-radius: 8px; }
.placeholder { border: 2px dashed #9ca3af; color: #6b7280; display: flex; align-items: center;
               justify-content: center; min-height: 2in; }
.question { margin-bottom: 20px; font-size: 16pt; }
.badge { display: inline-block; font-weight: bold; padding: 2px 10px; border-radius: 12px;
         background: #fde68a; margin-right: 8px; }
.write-line { border-bottom: 1px solid #555; height: 32px; }
.slots, .pool { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; margin: 12px 0; }
.slot { border: 3px dashed #6b7280; min-height: 2.2in; position: relative; }
.slot-number { position: absolute; top: 4px; left: 8px; font-weight: bold; font-size: 18pt; }
.card { border: 2px solid #111; padding: 6px; text-align: center; font-size: 13pt; background: #fff; }
.card img { width: 100%; aspect-ratio: 1 / 1; object-fit: cover; }
.cutout { border-style: dashed; }
.scenario { border: 2px solid #333; border-radius: 8px; padding: 12px; font-size: 16pt; }
.starter { font-weight: bold; font-size: 16pt; margin-top: 24px; }
@media print {
  body { background: #fff; }
  .no-print { display: none !important; }
  .sheet { box-shadow: none; margin: 0; }
}
"#;

/// Renders the whole toolkit as one printable HTML document.
pub fn render_toolkit(content: &ToolkitContent, board: &Board, mode: RenderMode) -> String {
    let mut html = String::with_capacity(16 * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{STYLESHEET}</style></head><body>",
        html_escape(&content.title)
    );

    if mode == RenderMode::Interactive {
        html.push_str(
            "<div class=\"toolbar no-print\">\
             <button type=\"button\" data-action=\"print\">Print Toolkit</button> \
             <button type=\"button\" data-action=\"reset-board\">Shuffle Cards</button>\
             </div>",
        );
    }

    html.push_str(&story_sheet(content));
    html.push_str(&questions_sheet(content, mode));
    html.push_str(&sequence_sheet(content, board, mode));
    html.push_str(&inference_sheet(content));
    html.push_str("</body></html>");
    html
}

fn name_line(content: &ToolkitContent) -> String {
    format!(
        "<div class=\"name-line\"><span>Name: {}</span><span>Date: ____________</span></div>",
        html_escape(&content.child_name)
    )
}

fn story_sheet(content: &ToolkitContent) -> String {
    let hero = match &content.story_image_url {
        Some(url) => format!(
            "<img src=\"{}\" alt=\"{}\">",
            html_escape(url),
            html_escape(&content.title)
        ),
        None => format!("<div class=\"placeholder\">{PLACEHOLDER}</div>"),
    };

    let paragraphs: String = content
        .story_text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", html_escape(p).replace('\n', "<br>")))
        .collect();

    format!(
        "<section class=\"sheet story-sheet\">{}<h1>{}</h1>\
         <div class=\"hero\">{hero}</div><div class=\"story\">{paragraphs}</div></section>",
        name_line(content),
        html_escape(&content.title)
    )
}

fn question_block(question: &WhQuestion) -> String {
    format!(
        "<div class=\"question\"><span class=\"badge\">{}</span>{}\
         <div class=\"write-line\"></div><div class=\"write-line\"></div></div>",
        question.category.label(),
        html_escape(&question.question)
    )
}

fn questions_sheet(content: &ToolkitContent, mode: RenderMode) -> String {
    let questions: String = content.questions.iter().map(question_block).collect();

    let answer_key = if mode == RenderMode::Interactive {
        let answers: String = content
            .questions
            .iter()
            .map(|q| {
                format!(
                    "<li><strong>{}:</strong> {}</li>",
                    q.category.label(),
                    html_escape(&q.answer)
                )
            })
            .collect();
        format!("<div class=\"answer-key no-print\"><h3>Answer Key</h3><ul>{answers}</ul></div>")
    } else {
        String::new()
    };

    format!(
        "<section class=\"sheet questions-sheet\">{}<h2>Story Questions</h2>{questions}{answer_key}</section>",
        name_line(content)
    )
}

fn card_html(card: &EventCard, extra_class: &str) -> String {
    let picture = match &card.image_url {
        Some(url) => format!(
            "<img src=\"{}\" alt=\"{}\">",
            html_escape(url),
            html_escape(&card.text)
        ),
        None => format!("<div class=\"placeholder\">{PLACEHOLDER}</div>"),
    };
    format!(
        "<div class=\"card {extra_class}\" data-card-id=\"{}\">{picture}<div class=\"caption\">{}</div></div>",
        html_escape(card.id.as_str()),
        html_escape(&card.text)
    )
}

fn sequence_sheet(content: &ToolkitContent, board: &Board, mode: RenderMode) -> String {
    let mut slots = String::new();
    let mut pool = String::new();

    match mode {
        RenderMode::Interactive => {
            for index in 0..SLOT_COUNT {
                let inner = board
                    .slot_card(index)
                    .map(|card| card_html(card, "draggable"))
                    .unwrap_or_default();
                let _ = write!(
                    slots,
                    "<div class=\"slot\" data-slot=\"{index}\"><span class=\"slot-number\">{}</span>{inner}</div>",
                    index + 1
                );
            }
            for card in board.pool_cards() {
                pool.push_str(&card_html(card, "draggable"));
            }
        }
        RenderMode::Print => {
            for index in 0..SLOT_COUNT {
                let _ = write!(
                    slots,
                    "<div class=\"slot\"><span class=\"slot-number\">{}</span></div>",
                    index + 1
                );
            }
            // every card becomes a cut-out, pool order first
            let placed = (0..SLOT_COUNT).filter_map(|i| board.slot_card(i));
            for card in board.pool_cards().chain(placed) {
                pool.push_str(&card_html(card, "cutout"));
            }
        }
    }

    let instructions = match mode {
        RenderMode::Interactive => "Drag the pictures into the boxes in the order they happened.",
        RenderMode::Print => "Cut out the pictures. Glue them in the boxes in the order they happened.",
    };

    format!(
        "<section class=\"sheet sequence-sheet\">{}<h2>What Happened First?</h2>\
         <p>{instructions}</p><div class=\"slots\">{slots}</div><div class=\"pool\">{pool}</div></section>",
        name_line(content)
    )
}

fn inference_sheet(content: &ToolkitContent) -> String {
    let starters: String = content
        .inference
        .sentence_starters
        .iter()
        .map(|s| {
            format!(
                "<div class=\"starter\">{}</div><div class=\"write-line\"></div><div class=\"write-line\"></div>",
                html_escape(s)
            )
        })
        .collect();

    format!(
        "<section class=\"sheet inference-sheet\">{}<h2>Be a Detective!</h2>\
         <div class=\"scenario\">{}</div>{starters}</section>",
        name_line(content),
        html_escape(&content.inference.scenario)
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
