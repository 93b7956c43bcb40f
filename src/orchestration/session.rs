use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnswerSheet, Quiz, StudyMaterials, Topic};
use crate::review::{FocusedReviewBundle, RemediationCycle};
use crate::students::Student;

/// Default number of questions per quiz when the session does not override it.
pub const DEFAULT_QUESTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// Everything one study session knows about its student and topic. Owned by
/// the caller and passed into each orchestrator operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSession {
    pub session_id: Uuid,
    pub student: Student,
    pub topic: Topic,
    pub materials: StudyMaterials,
    #[serde(default)]
    pub quiz: Option<Quiz>,
    #[serde(default)]
    pub answers: AnswerSheet,
    #[serde(default)]
    pub cycle: RemediationCycle,
    #[serde(default)]
    pub review_bundle: Option<FocusedReviewBundle>,
    pub question_count: usize,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningSession {
    pub fn new(student: Student, topic: Topic, materials: StudyMaterials) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            student,
            topic,
            materials,
            quiz: None,
            answers: AnswerSheet::default(),
            cycle: RemediationCycle::new(),
            review_bundle: None,
            question_count: DEFAULT_QUESTION_COUNT,
            status: SessionStatus::Active,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count.max(1);
        self
    }

    /// Installs a freshly generated quiz with an empty answer sheet.
    pub fn set_quiz(&mut self, quiz: Quiz) {
        self.answers = AnswerSheet::blank(quiz.len());
        self.quiz = Some(quiz);
        self.touch();
    }

    pub fn answer(&mut self, index: usize, answer: impl Into<String>) {
        self.answers.set(index, answer);
        self.touch();
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.touch();
    }

    pub fn cancel(&mut self) {
        self.status = SessionStatus::Cancelled;
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
