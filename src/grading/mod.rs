//! Quiz grading: scores an answer list against a quiz's answer key and
//! collects the topic tags of missed questions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{split_option_label, Question, Quiz};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("cannot grade an empty quiz")]
    EmptyQuiz,
    #[error("quiz has {questions} questions but {answers} answers were submitted")]
    AnswerCountMismatch { questions: usize, answers: usize },
    #[error("unanswered questions: {missing:?}")]
    IncompleteAnswers { missing: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// 1-based question number.
    pub number: usize,
    pub correct: bool,
    pub topic: String,
    /// Readable form of the expected answer, for result display.
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    /// Percentage in `[0, 100]`, one decimal.
    pub score: f64,
    pub correct_count: usize,
    pub total: usize,
    pub weak_topics: BTreeSet<String>,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Grades `answers` against `quiz`. Both must have the same length and every
/// answer must be non-blank.
pub fn grade_quiz(quiz: &Quiz, answers: &[String]) -> Result<GradeResult, GradingError> {
    if quiz.is_empty() {
        return Err(GradingError::EmptyQuiz);
    }
    if answers.len() != quiz.len() {
        return Err(GradingError::AnswerCountMismatch {
            questions: quiz.len(),
            answers: answers.len(),
        });
    }
    let missing: Vec<usize> = answers
        .iter()
        .enumerate()
        .filter(|(_, a)| a.trim().is_empty())
        .map(|(idx, _)| idx + 1)
        .collect();
    if !missing.is_empty() {
        return Err(GradingError::IncompleteAnswers { missing });
    }

    let mut weak_topics = BTreeSet::new();
    let mut outcomes = Vec::with_capacity(quiz.len());
    for (idx, (question, answer)) in quiz.questions.iter().zip(answers).enumerate() {
        let correct = is_correct(question, answer);
        if !correct {
            weak_topics.insert(question.topic().trim().to_string());
        }
        outcomes.push(QuestionOutcome {
            number: idx + 1,
            correct,
            topic: question.topic().to_string(),
            expected: expected_answer(question),
        });
    }
    let correct_count = outcomes.iter().filter(|o| o.correct).count();
    let total = quiz.len();
    Ok(GradeResult {
        score: percentage(correct_count, total),
        correct_count,
        total,
        weak_topics,
        outcomes,
    })
}

/// Applies the per-variant correctness rule to one answer.
pub fn is_correct(question: &Question, answer: &str) -> bool {
    match question {
        Question::MultipleChoice(q) => {
            // The UI may show options with or without their letter. Option
            // text can itself start with something label-shaped ("E. coli"),
            // so the raw answer is tried before the label-stripped one.
            let Some((_, text)) = q.correct_option() else {
                return false;
            };
            let answer = answer.trim();
            answer == text
                || matches!(split_option_label(answer), (Some(_), chosen) if chosen == text)
        }
        Question::TrueFalse(q) => answer.trim() == q.answer.as_str(),
        Question::ShortAnswer(q) => {
            let answer = answer.to_lowercase();
            q.answer_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .any(|k| answer.contains(&k))
        }
    }
}

fn expected_answer(question: &Question) -> String {
    match question {
        Question::MultipleChoice(q) => q
            .correct_option()
            .map(|(label, text)| format!("{label}. {text}"))
            .unwrap_or_else(|| q.answer.clone()),
        Question::TrueFalse(q) => q.answer.as_str().to_string(),
        Question::ShortAnswer(q) => q.answer_keywords.join(", "),
    }
}

/// `100 * correct / total`, rounded to one decimal. `total` must be non-zero.
pub fn percentage(correct: usize, total: usize) -> f64 {
    let raw = 100.0 * correct as f64 / total as f64;
    (raw * 10.0).round() / 10.0
}
