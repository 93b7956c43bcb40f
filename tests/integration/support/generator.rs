use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use cognitivetwin::generation::{ContentGenerator, GenerationError, QuizPlan};
use cognitivetwin::models::{Flashcard, Question, Quiz, TrueFalse, TruthValue};

/// Marker present in every summary produced from a narrowing prompt.
pub const FOCUSED_MARKER: &str = "focused notes";

/// Deterministic generator for integration tests. Quizzes are handed out in
/// the order they were queued.
#[derive(Default)]
pub struct ScriptedGenerator {
    quizzes: Mutex<VecDeque<Quiz>>,
    quiz_sources: Mutex<Vec<String>>,
    fail_summary: bool,
    fail_narrowing: bool,
    fail_mindmap: bool,
    flashcard_delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic summaries fail; narrowing prompts still succeed.
    pub fn failing_summary(mut self) -> Self {
        self.fail_summary = true;
        self
    }

    pub fn failing_narrowing(mut self) -> Self {
        self.fail_narrowing = true;
        self
    }

    pub fn failing_mindmap(mut self) -> Self {
        self.fail_mindmap = true;
        self
    }

    pub fn with_flashcard_delay(mut self, delay: Duration) -> Self {
        self.flashcard_delay = Some(delay);
        self
    }

    pub fn queue_quiz(&self, quiz: Quiz) {
        self.quizzes.lock().unwrap().push_back(quiz);
    }

    /// Texts each quiz was generated from, oldest first.
    pub fn quiz_sources(&self) -> Vec<String> {
        self.quiz_sources.lock().unwrap().clone()
    }
}

impl ContentGenerator for ScriptedGenerator {
    fn generate_summary(&self, text: &str) -> Result<String, GenerationError> {
        if text.contains("struggling with these specific topics") {
            if self.fail_narrowing {
                return Err(GenerationError::EmptyResponse);
            }
            let topics = text
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("The student is struggling with these specific topics: ")
                .trim_end_matches('.');
            return Ok(format!("{FOCUSED_MARKER} on {topics}"));
        }
        if self.fail_summary {
            return Err(GenerationError::Malformed("no summary".into()));
        }
        let head: String = text.chars().take(40).collect();
        Ok(format!("summary of: {head}"))
    }

    fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, GenerationError> {
        if let Some(delay) = self.flashcard_delay {
            thread::sleep(delay);
        }
        Ok(vec![Flashcard {
            keyword: "Key idea".into(),
            definition: text.chars().take(30).collect(),
        }])
    }

    fn generate_mindmap(&self, text: &str) -> Result<String, GenerationError> {
        if self.fail_mindmap {
            return Err(GenerationError::Malformed("mindmap has no headings".into()));
        }
        Ok(format!("# {}", text.lines().next().unwrap_or_default()))
    }

    fn generate_quiz(&self, text: &str, _plan: QuizPlan) -> Result<Quiz, GenerationError> {
        self.quiz_sources.lock().unwrap().push(text.to_string());
        self.quizzes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GenerationError::EmptyResponse)
    }

    fn generate_formula_sheet(&self, _text: &str) -> Result<String, GenerationError> {
        Ok("## Important Formulas\n$$dS = dQ/T$$".into())
    }
}

/// A true/false quiz whose answer key is always `True`, one question per
/// topic tag.
pub fn true_false_quiz(topics: &[&str]) -> Quiz {
    Quiz::new(
        topics
            .iter()
            .enumerate()
            .map(|(idx, topic)| {
                Question::TrueFalse(TrueFalse {
                    prompt: format!("Statement {}", idx + 1),
                    topic: topic.to_string(),
                    options: vec!["True".into(), "False".into()],
                    answer: TruthValue::True,
                })
            })
            .collect(),
    )
}

/// Twenty questions where the first `correct` carry `strong` and the rest
/// carry `weak`. Pair with `answers_scoring(correct)` for a score of
/// `5 * correct` percent.
pub fn scored_quiz(correct: usize, strong: &str, weak: &str) -> Quiz {
    let topics: Vec<&str> = (0..20)
        .map(|idx| if idx < correct { strong } else { weak })
        .collect();
    true_false_quiz(&topics)
}
