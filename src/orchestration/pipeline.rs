//! Submission pipeline: grade, record, aggregate, decide, and drive the
//! remediation cycle for a caller-owned [`LearningSession`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{
    log_migration_required, log_progress_stale, log_progress_updated, log_quiz_generated,
    log_quiz_graded, log_retake_started, log_review_bundle_ready, log_review_requested,
    log_summary_superseded, log_topic_created, LearningEventDetails,
};
use super::session::LearningSession;
use crate::decision::{decide, Action, DecisionInput};
use crate::generation::{ContentGenerator, GenerationError, QuizPlan};
use crate::grading::{grade_quiz, GradeResult, GradingError};
use crate::models::{
    AnswerSheet, ProgressRecord, Quiz, QuizAttempt, SourceKind, StudyMaterials, Topic,
};
use crate::progress::{ProgressAggregator, ProgressError, ProgressWarning};
use crate::review::{
    run_with_deadline, FocusedReviewBundle, FocusedReviewCoordinator, RemediationError,
};
use crate::storage::{compute_hash, LearningStore};
use crate::students::{AppConfig, QuizSettings, Student};

/// Why the progress record could not be brought up to date after a
/// submission. The attempt itself is always stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressIssue {
    /// The aggregate could not be loaded or written and is now behind the
    /// attempt log. Recomputing from attempts repairs it.
    Stale { reason: String },
    /// The stored record still uses the legacy weak-topic list.
    MigrationRequired { legacy_topics: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: QuizAttempt,
    pub grade: GradeResult,
    /// Updated record, or `None` when `progress_issue` is set.
    pub progress: Option<ProgressRecord>,
    pub progress_issue: Option<ProgressIssue>,
    pub warnings: Vec<ProgressWarning>,
    pub action: Action,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no quiz is active in this session")]
    NoActiveQuiz,
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Cycle(#[from] RemediationError),
    #[error("failed to record attempt: {0:#}")]
    Storage(anyhow::Error),
}

pub struct LearningOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    coordinator: FocusedReviewCoordinator,
    quiz_settings: QuizSettings,
    call_timeout: Duration,
}

impl LearningOrchestrator {
    pub fn new(generator: Arc<dyn ContentGenerator>, config: &AppConfig) -> Self {
        let call_timeout = config.generation.call_timeout;
        Self {
            coordinator: FocusedReviewCoordinator::new(Arc::clone(&generator), call_timeout),
            generator,
            quiz_settings: config.quiz.clone(),
            call_timeout,
        }
    }

    /// Creates a topic from raw study text. The summary is required; mindmap,
    /// flashcards and formula sheet are generated best-effort from the same
    /// text.
    pub fn start_topic(
        &self,
        student: &Student,
        name: &str,
        source_kind: SourceKind,
        raw_text: &str,
    ) -> Result<LearningSession> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Topic name must not be empty.");
        }
        if raw_text.trim().is_empty() {
            bail!("Topic text must not be empty.");
        }

        let summary = self
            .call("summary", raw_text, |g, text| g.generate_summary(text))
            .with_context(|| format!("Failed to summarise topic {name}"))?;
        let topic = Topic::new(student.id, name, source_kind, summary);

        let mindmap = self.call("mindmap", raw_text, |g, text| g.generate_mindmap(text));
        let flashcards = self.call("flashcards", raw_text, |g, text| g.generate_flashcards(text));
        let formula_sheet = self.call("formula-sheet", raw_text, |g, text| {
            g.generate_formula_sheet(text)
        });
        let mut materials = StudyMaterials::empty(topic.topic_id);
        materials.mindmap = keep_best_effort(name, "mindmap", mindmap);
        materials.flashcards = keep_best_effort(name, "flashcards", flashcards).unwrap_or_default();
        materials.formula_sheet = keep_best_effort(name, "formula sheet", formula_sheet);

        let store = LearningStore::new(student);
        store.save_topic(&topic)?;
        store.save_materials(&materials)?;
        if let Err(err) = log_topic_created(
            student,
            LearningEventDetails::for_topic(&topic).with_payload(serde_json::json!({
                "source_kind": topic.source_kind.label(),
                "summary_sha256": compute_hash(topic.summary.as_bytes()),
                "has_mindmap": materials.mindmap.is_some(),
                "flashcards": materials.flashcards.len(),
                "has_formula_sheet": materials.formula_sheet.is_some(),
            })),
        ) {
            warn!(student_id = %student.id, error = %err, "failed to log topic creation");
        }
        info!(student_id = %student.id, topic_id = %topic.topic_id, topic = %topic.name, "topic started");

        Ok(LearningSession::new(student.clone(), topic, materials)
            .with_question_count(self.quiz_settings.default_question_count))
    }

    /// Reopens a stored topic in a new session.
    pub fn resume_topic(&self, student: &Student, topic_id: &Uuid) -> Result<LearningSession> {
        let store = LearningStore::new(student);
        let topic = store
            .load_topic(topic_id)?
            .ok_or_else(|| anyhow!("Topic {topic_id} not found for student {}", student.id))?;
        let materials = store
            .load_materials(topic_id)?
            .unwrap_or_else(|| StudyMaterials::empty(*topic_id));
        let attempts = store.attempts_for_topic(topic_id)?;
        debug!(
            student_id = %student.id,
            %topic_id,
            prior_attempts = attempts.len(),
            best_score = ?attempts.iter().map(|a| a.score).reduce(f64::max),
            "topic resumed"
        );
        Ok(LearningSession::new(student.clone(), topic, materials)
            .with_question_count(self.quiz_settings.default_question_count))
    }

    /// Generates a quiz from the topic's current summary and installs it in
    /// the session.
    pub fn prepare_quiz<'s>(&self, session: &'s mut LearningSession) -> Result<&'s Quiz> {
        session.cycle.ensure_accepts_quiz("prepare a quiz")?;
        let requested = session
            .question_count
            .min(self.quiz_settings.max_question_count);
        let plan = QuizPlan::for_text(session.topic.summary.chars().count(), requested);
        let summary = session.topic.summary.clone();
        let generator = Arc::clone(&self.generator);
        let quiz = run_with_deadline("quiz", self.call_timeout, move || {
            generator.generate_quiz(&summary, plan)
        })
        .with_context(|| format!("Failed to generate a quiz for {}", session.topic.name))?;

        if let Err(err) = log_quiz_generated(
            &session.student,
            LearningEventDetails::for_topic(&session.topic).with_payload(serde_json::json!({
                "session_id": session.session_id,
                "questions": quiz.len(),
                "plan": plan,
                "summary_revision": session.topic.summary_revision,
            })),
        ) {
            warn!(student_id = %session.student.id, error = %err, "failed to log generated quiz");
        }
        session.set_quiz(quiz);
        session
            .quiz
            .as_ref()
            .ok_or_else(|| anyhow!("quiz missing from session after generation"))
    }

    /// Grades the session's quiz against `answers`, stores the attempt, folds
    /// it into progress and returns the next action.
    ///
    /// Validation failures return before anything is written. Once the
    /// attempt is stored, progress and event-log failures are reported in
    /// the outcome rather than as errors.
    pub fn submit_quiz(
        &self,
        session: &mut LearningSession,
        answers: &AnswerSheet,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let quiz = session.quiz.as_ref().ok_or(SubmissionError::NoActiveQuiz)?;
        session.cycle.ensure_accepts_quiz("record a grade")?;
        let submitted = answers.require_complete(quiz.len())?;
        let grade = grade_quiz(quiz, &submitted)?;

        let student = session.student.clone();
        let attempt = QuizAttempt::record(
            student.id,
            session.topic.topic_id,
            quiz,
            submitted,
            &grade,
        );
        let aggregator = ProgressAggregator::new(&student);
        aggregator
            .store()
            .append_attempt(&attempt)
            .map_err(SubmissionError::Storage)?;
        info!(
            student_id = %student.id,
            topic = %session.topic.name,
            score = grade.score,
            correct = grade.correct_count,
            total = grade.total,
            "quiz graded"
        );
        if let Err(err) = log_quiz_graded(
            &student,
            LearningEventDetails::for_attempt(&attempt, Some(session.topic.name.as_str())),
        ) {
            warn!(student_id = %student.id, error = %err, "failed to log graded quiz");
        }

        let (progress, progress_issue, warnings) =
            self.fold_progress(&aggregator, &student, &attempt, &grade);

        let action = decide(
            grade.score,
            &DecisionInput {
                student_name: &student.name,
                topic_name: &session.topic.name,
                weak_topics: &grade.weak_topics,
            },
        );
        session.cycle.record_grade(grade.score, &grade.weak_topics)?;
        session.quiz = None;
        session.answers = AnswerSheet::default();
        session.review_bundle = None;
        session.touch();

        Ok(SubmissionOutcome {
            attempt,
            grade,
            progress,
            progress_issue,
            warnings,
            action,
        })
    }

    fn fold_progress(
        &self,
        aggregator: &ProgressAggregator<'_>,
        student: &Student,
        attempt: &QuizAttempt,
        grade: &GradeResult,
    ) -> (Option<ProgressRecord>, Option<ProgressIssue>, Vec<ProgressWarning>) {
        match aggregator.update_progress(&attempt.topic_id, grade) {
            Ok(update) => {
                let details = LearningEventDetails::for_attempt(attempt, None).with_payload(
                    serde_json::json!({
                        "total_topics": update.record.total_topics,
                        "completed_topics": update.record.completed_topics,
                        "average_score": update.record.average_score,
                        "warnings": update.warnings,
                    }),
                );
                if let Err(err) = log_progress_updated(student, details) {
                    warn!(student_id = %student.id, error = %err, "failed to log progress update");
                }
                (Some(update.record), None, update.warnings)
            }
            Err(ProgressError::MigrationRequired { legacy_topics }) => {
                warn!(
                    student_id = %student.id,
                    legacy = legacy_topics.len(),
                    "progress record needs weak topic migration"
                );
                if let Err(err) = log_migration_required(student, &legacy_topics) {
                    warn!(student_id = %student.id, error = %err, "failed to log migration requirement");
                }
                (
                    None,
                    Some(ProgressIssue::MigrationRequired { legacy_topics }),
                    Vec::new(),
                )
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(student_id = %student.id, error = %reason, "progress record is stale");
                let details = LearningEventDetails::for_attempt(attempt, None)
                    .with_payload(serde_json::json!({ "reason": reason }));
                if let Err(err) = log_progress_stale(student, details) {
                    warn!(student_id = %student.id, error = %err, "failed to log stale progress");
                }
                (None, Some(ProgressIssue::Stale { reason }), Vec::new())
            }
        }
    }

    /// Builds narrowed material for the subtopics missed in the latest
    /// attempt and stages it in the session.
    pub fn request_focused_review<'s>(
        &self,
        session: &'s mut LearningSession,
    ) -> Result<&'s FocusedReviewBundle> {
        session.cycle.request_review()?;
        let weak = session.cycle.weak_subtopics().clone();
        if let Err(err) = log_review_requested(
            &session.student,
            LearningEventDetails::for_topic(&session.topic).with_weak_topics(&weak),
        ) {
            warn!(student_id = %session.student.id, error = %err, "failed to log review request");
        }

        let bundle =
            self.coordinator
                .build_focused_review(&session.topic.name, &session.topic.summary, &weak);
        session.cycle.mark_bundle_ready()?;
        let missing: Vec<&str> = bundle.missing_fields().iter().map(|f| f.label()).collect();
        if let Err(err) = log_review_bundle_ready(
            &session.student,
            LearningEventDetails::for_topic(&session.topic)
                .with_weak_topics(&weak)
                .with_payload(serde_json::json!({
                    "missing": missing,
                    "failures": bundle.failures,
                    "round": session.cycle.rounds() + 1,
                })),
        ) {
            warn!(student_id = %session.student.id, error = %err, "failed to log review bundle");
        }
        session.review_bundle = Some(bundle);
        session.touch();
        session
            .review_bundle
            .as_ref()
            .ok_or_else(|| anyhow!("review bundle missing from session"))
    }

    /// Replaces the topic summary with the review bundle's summary and
    /// generates the retake quiz from it. Without a focused summary the
    /// retake falls back to the current summary.
    ///
    /// The cycle only moves once the superseded topic is stored. If quiz
    /// generation fails afterwards, [`Self::prepare_quiz`] can be retried.
    pub fn start_retake<'s>(&self, session: &'s mut LearningSession) -> Result<&'s Quiz> {
        let mut cycle = session.cycle.clone();
        cycle.request_retake()?;
        let focused = session
            .review_bundle
            .as_ref()
            .and_then(|bundle| bundle.summary.clone());
        match focused {
            Some(summary) => {
                let before = compute_hash(session.topic.summary.as_bytes());
                let mut topic = session.topic.clone();
                topic.supersede_summary(summary);
                LearningStore::new(&session.student).save_topic(&topic)?;
                session.topic = topic;
                session.cycle = cycle;
                if let Err(err) = log_summary_superseded(
                    &session.student,
                    LearningEventDetails::for_topic(&session.topic).with_payload(
                        serde_json::json!({
                            "summary_revision": session.topic.summary_revision,
                            "sha256_before": before,
                            "sha256_after": compute_hash(session.topic.summary.as_bytes()),
                        }),
                    ),
                ) {
                    warn!(student_id = %session.student.id, error = %err, "failed to log summary supersession");
                }
            }
            None => {
                warn!(
                    topic = %session.topic.name,
                    "no focused summary available; retaking on the current summary"
                );
                session.cycle = cycle;
            }
        }
        if let Err(err) = log_retake_started(
            &session.student,
            LearningEventDetails::for_topic(&session.topic)
                .with_weak_topics(session.cycle.weak_subtopics())
                .with_payload(serde_json::json!({ "round": session.cycle.rounds() + 1 })),
        ) {
            warn!(student_id = %session.student.id, error = %err, "failed to log retake start");
        }
        self.prepare_quiz(session)
    }

    fn call<T, F>(&self, name: &str, text: &str, f: F) -> Result<T, GenerationError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ContentGenerator, &str) -> Result<T, GenerationError> + Send + 'static,
    {
        let generator = Arc::clone(&self.generator);
        let text = text.to_string();
        run_with_deadline(name, self.call_timeout, move || f(generator.as_ref(), &text))
    }
}

fn keep_best_effort<T>(topic: &str, what: &str, result: Result<T, GenerationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(topic, error = %err, "{what} generation failed; continuing without it");
            None
        }
    }
}
