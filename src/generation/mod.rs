//! Content-generation collaborator: summaries, flashcards, mindmaps, quizzes
//! and formula sheets produced by a language model.
//!
//! Implementations must fail loudly. A response that cannot be parsed into
//! the expected structure is a [`GenerationError`], never a best-effort value.

pub mod openai;
pub mod prompts;

pub use openai::OpenAiGenerator;
pub use prompts::QuizPlan;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Flashcard, Quiz, QuizDefect};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("content generation not configured: {0}")]
    NotConfigured(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("generation timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("generation worker exited without a result")]
    WorkerLost,
}

impl From<QuizDefect> for GenerationError {
    fn from(defect: QuizDefect) -> Self {
        GenerationError::Malformed(defect.to_string())
    }
}

/// Wire shape of a flashcard response: `{"flashcards": [{keyword, definition}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub flashcards: Vec<Flashcard>,
}

impl FlashcardSet {
    /// Rejects empty sets and cards with a blank keyword or definition.
    pub fn validate(self) -> Result<Vec<Flashcard>, GenerationError> {
        if self.flashcards.is_empty() {
            return Err(GenerationError::Malformed("no flashcards returned".into()));
        }
        if let Some(idx) = self
            .flashcards
            .iter()
            .position(|c| c.keyword.trim().is_empty() || c.definition.trim().is_empty())
        {
            return Err(GenerationError::Malformed(format!(
                "flashcard {} is missing a keyword or definition",
                idx + 1
            )));
        }
        Ok(self.flashcards)
    }
}

pub trait ContentGenerator: Send + Sync {
    fn generate_summary(&self, text: &str) -> Result<String, GenerationError>;

    fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, GenerationError>;

    /// Markdown heading outline (`#`, `##`, `###`, `-`).
    fn generate_mindmap(&self, text: &str) -> Result<String, GenerationError>;

    /// Returns a quiz that already passed [`Quiz::validate`].
    fn generate_quiz(&self, text: &str, plan: QuizPlan) -> Result<Quiz, GenerationError>;

    fn generate_formula_sheet(&self, text: &str) -> Result<String, GenerationError>;

    /// Summary of `original` that concentrates on the weak subtopics.
    fn narrow_summary(
        &self,
        original: &str,
        weak_subtopics: &BTreeSet<String>,
    ) -> Result<String, GenerationError> {
        self.generate_summary(&prompts::focused_summary_source(original, weak_subtopics))
    }
}
