use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::grading::{GradeResult, GradingError};

/// One quiz question. The wire tags match what the generator emits
/// (`"MCQ"`, `"T/F"`, `"Short"`); anything else fails to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Question {
    #[serde(rename = "MCQ")]
    MultipleChoice(MultipleChoice),
    #[serde(rename = "T/F")]
    TrueFalse(TrueFalse),
    #[serde(rename = "Short")]
    ShortAnswer(ShortAnswer),
}

impl Question {
    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.prompt,
            Question::TrueFalse(q) => &q.prompt,
            Question::ShortAnswer(q) => &q.prompt,
        }
    }

    /// Short subtopic tag reported back when the question is missed.
    pub fn topic(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.topic,
            Question::TrueFalse(q) => &q.topic,
            Question::ShortAnswer(q) => &q.topic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoice {
    #[serde(rename = "question")]
    pub prompt: String,
    pub topic: String,
    /// Four options, usually written as `"A. text"`.
    pub options: Vec<String>,
    /// Letter of the correct option.
    pub answer: String,
}

impl MultipleChoice {
    /// Options paired with their label: the explicit `X.`/`X)` prefix when
    /// present, otherwise the positional letter.
    pub fn labeled_options(&self) -> Vec<(char, &str)> {
        self.options
            .iter()
            .enumerate()
            .map(|(idx, raw)| {
                let (label, text) = split_option_label(raw);
                (label.unwrap_or_else(|| positional_label(idx)), text)
            })
            .collect()
    }

    pub fn answer_letter(&self) -> Option<char> {
        let (label, text) = split_option_label(&self.answer);
        label.or_else(|| {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
                _ => None,
            }
        })
    }

    /// The option the answer key points at, as `(label, text)`.
    pub fn correct_option(&self) -> Option<(char, &str)> {
        let letter = self.answer_letter()?;
        self.labeled_options()
            .into_iter()
            .find(|(label, _)| *label == letter)
    }
}

fn positional_label(idx: usize) -> char {
    (b'A' + (idx % 26) as u8) as char
}

/// Splits `"B. Rome"` / `"b) Rome"` into `(Some('B'), "Rome")`. Text without
/// a single-letter prefix is returned whole (trimmed) with no label.
pub fn split_option_label(raw: &str) -> (Option<char>, &str) {
    let trimmed = raw.trim();
    let mut chars = trimmed.char_indices();
    if let (Some((_, letter)), Some((sep_idx, sep))) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() && (sep == '.' || sep == ')') {
            let rest = &trimmed[sep_idx + sep.len_utf8()..];
            return (Some(letter.to_ascii_uppercase()), rest.trim());
        }
    }
    (None, trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruthValue {
    True,
    False,
}

impl TruthValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruthValue::True => "True",
            TruthValue::False => "False",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalse {
    #[serde(rename = "question")]
    pub prompt: String,
    pub topic: String,
    #[serde(default = "true_false_options")]
    pub options: Vec<String>,
    pub answer: TruthValue,
}

fn true_false_options() -> Vec<String> {
    vec!["True".to_string(), "False".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswer {
    #[serde(rename = "question")]
    pub prompt: String,
    pub topic: String,
    pub answer_keywords: Vec<String>,
}

/// Structural problems in a quiz, reported per question (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizDefect {
    #[error("quiz has no questions")]
    Empty,
    #[error("question {0} has an empty prompt or topic tag")]
    MissingText(usize),
    #[error("question {index} has {found} options; multiple choice needs 4")]
    OptionCount { index: usize, found: usize },
    #[error("question {0} answer key does not label any option")]
    UnknownAnswerKey(usize),
    #[error("question {0} true/false options must be exactly [\"True\", \"False\"]")]
    TrueFalseOptions(usize),
    #[error("question {index} has {found} keywords; short answer needs 1 to 3")]
    KeywordCount { index: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "quiz")]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn validate(&self) -> Result<(), QuizDefect> {
        if self.questions.is_empty() {
            return Err(QuizDefect::Empty);
        }
        for (idx, question) in self.questions.iter().enumerate() {
            let index = idx + 1;
            if question.prompt().trim().is_empty() || question.topic().trim().is_empty() {
                return Err(QuizDefect::MissingText(index));
            }
            match question {
                Question::MultipleChoice(q) => {
                    if q.options.len() != 4 {
                        return Err(QuizDefect::OptionCount {
                            index,
                            found: q.options.len(),
                        });
                    }
                    if q.correct_option().is_none() {
                        return Err(QuizDefect::UnknownAnswerKey(index));
                    }
                }
                Question::TrueFalse(q) => {
                    if q.options != true_false_options() {
                        return Err(QuizDefect::TrueFalseOptions(index));
                    }
                }
                Question::ShortAnswer(q) => {
                    let found = q
                        .answer_keywords
                        .iter()
                        .filter(|k| !k.trim().is_empty())
                        .count();
                    if found == 0 || found > 3 || found != q.answer_keywords.len() {
                        return Err(QuizDefect::KeywordCount {
                            index,
                            found: q.answer_keywords.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Student answers, one slot per question. A slot stays `None` until answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    slots: Vec<Option<String>>,
}

impl AnswerSheet {
    pub fn blank(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn set(&mut self, index: usize, answer: impl Into<String>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(answer.into());
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns trimmed answers when every slot is filled, otherwise the
    /// 1-based numbers of the unanswered questions.
    pub fn require_complete(&self, questions: usize) -> Result<Vec<String>, GradingError> {
        if self.slots.len() != questions {
            return Err(GradingError::AnswerCountMismatch {
                questions,
                answers: self.slots.len(),
            });
        }
        let missing: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(idx, _)| idx + 1)
            .collect();
        if !missing.is_empty() {
            return Err(GradingError::IncompleteAnswers { missing });
        }
        Ok(self
            .slots
            .iter()
            .map(|slot| slot.as_deref().unwrap_or_default().trim().to_string())
            .collect())
    }
}

impl From<Vec<Option<String>>> for AnswerSheet {
    fn from(slots: Vec<Option<String>>) -> Self {
        Self { slots }
    }
}

/// One graded administration of a quiz. Never mutated once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub attempt_id: Uuid,
    pub student_id: Uuid,
    pub topic_id: Uuid,
    pub questions: Vec<Question>,
    pub answers: Vec<String>,
    pub score: f64,
    pub correct_count: usize,
    pub total: usize,
    #[serde(default)]
    pub weak_topics: BTreeSet<String>,
    #[serde(default)]
    pub outcomes: Vec<bool>,
    pub taken_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn record(
        student_id: Uuid,
        topic_id: Uuid,
        quiz: &Quiz,
        answers: Vec<String>,
        grade: &GradeResult,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            student_id,
            topic_id,
            questions: quiz.questions.clone(),
            answers,
            score: grade.score,
            correct_count: grade.correct_count,
            total: grade.total,
            weak_topics: grade.weak_topics.clone(),
            outcomes: grade.outcomes.iter().map(|o| o.correct).collect(),
            taken_at: Utc::now(),
        }
    }
}
