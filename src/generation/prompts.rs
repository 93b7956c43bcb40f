//! Prompt construction and quiz sizing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const ASSISTANT_SYSTEM: &str = "You are a helpful learning assistant.";
pub const JSON_SYSTEM: &str = "You are a helpful learning assistant. You must output valid JSON.";
pub const FORMULA_SYSTEM: &str = "You are an assistant that extracts key formulas and definitions.";

/// Texts shorter than this get at most [`SHORT_TEXT_QUESTION_CAP`] questions.
pub const SHORT_TEXT_CHARS: usize = 1000;
pub const SHORT_TEXT_QUESTION_CAP: usize = 5;
pub const MAX_QUESTIONS: usize = 15;

/// How many questions of each kind to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPlan {
    pub total: usize,
    pub multiple_choice: usize,
    pub true_false: usize,
    pub short_answer: usize,
}

impl QuizPlan {
    /// Sizes a quiz for a source text of `text_len` characters. The mix is
    /// 60% multiple choice and 20% true/false (both rounded down) with the
    /// remainder short answer.
    pub fn for_text(text_len: usize, requested: usize) -> Self {
        let mut total = requested.clamp(1, MAX_QUESTIONS);
        if text_len < SHORT_TEXT_CHARS {
            total = total.min(SHORT_TEXT_QUESTION_CAP);
        }
        let multiple_choice = total * 3 / 5;
        let true_false = total / 5;
        Self {
            total,
            multiple_choice,
            true_false,
            short_answer: total - multiple_choice - true_false,
        }
    }
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Write a detailed, well-structured summary of the text below for a student \
         learning the topic from scratch. Format it in markdown with headings, \
         subheadings and bullet points.\n\nText:\n{text}"
    )
}

/// Source text handed to the summary generator when narrowing a topic to the
/// subtopics a student missed.
pub fn focused_summary_source(original: &str, weak_subtopics: &BTreeSet<String>) -> String {
    let topics = weak_subtopics
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The student is struggling with these specific topics: {topics}.\n\
         Using the original text below, write a new summary that explains these \
         weak topics in detail.\n\nOriginal Text:\n{original}"
    )
}

pub fn flashcards_prompt(text: &str) -> String {
    format!(
        "Generate 10-15 key flashcards from the text below. Return a JSON object with \
         a single key \"flashcards\" holding a list of objects, each with the keys \
         \"keyword\" and \"definition\".\n\nExample:\n\
         {{\"flashcards\": [{{\"keyword\": \"Variable\", \"definition\": \"A named storage location.\"}}]}}\n\n\
         Text:\n{text}"
    )
}

/// Mindmap prompt over at most `max_chars` characters of `text`.
pub fn mindmap_prompt(text: &str, max_chars: usize) -> String {
    let text = truncate_chars(text, max_chars);
    format!(
        "Create a hierarchical markdown mindmap of the text below. Use # for the main \
         topic, ## for subtopics, ### for details and - for key points. Focus on the \
         main concepts and how they relate.\n\nExample:\n# Main Topic\n## Subtopic 1\n\
         ### Detail 1\n- Key point\n## Subtopic 2\n\nText to analyze: {text}\n\n\
         Respond only with the markdown mindmap."
    )
}

pub fn formula_sheet_prompt(text: &str) -> String {
    format!(
        "Extract every key formula, equation and important definition from the text \
         below. Format them in markdown: headings for categories, lists for \
         definitions and $$...$$ blocks for formulas. If there are no formulas, list \
         the key concepts and principles instead.\n\nText:\n{text}"
    )
}

pub fn quiz_prompt(text: &str, plan: QuizPlan) -> String {
    format!(
        "Generate a quiz with {total} questions from the text below, mixing:\n\
         - {mcq} Multiple Choice Questions (MCQ)\n\
         - {tf} True/False Questions (T/F)\n\
         - {short} Short Answer Questions (Short)\n\n\
         Return a JSON object with a single key \"quiz\" holding a list of question objects.\n\
         Every question object MUST have:\n\
         1. \"type\": one of \"MCQ\", \"T/F\" or \"Short\".\n\
         2. \"question\": the question text.\n\
         3. \"topic\": a 1-3 word topic for this question (e.g. \"Data Types\").\n\n\
         For \"MCQ\": \"options\" is a list of 4 strings like [\"A. ...\", \"B. ...\", \"C. ...\", \"D. ...\"] \
         and \"answer\" is the correct option letter (e.g. \"A\").\n\
         For \"T/F\": \"options\" must be [\"True\", \"False\"] and \"answer\" is \"True\" or \"False\".\n\
         For \"Short\": \"answer_keywords\" is a list of 1-3 keywords, one of which must appear \
         in a correct answer (e.g. [\"Ohm's Law\", \"Voltage\"]).\n\n\
         Text:\n{text}",
        total = plan.total,
        mcq = plan.multiple_choice,
        tf = plan.true_false,
        short = plan.short_answer,
    )
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
