use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{log_event, EventType};
use crate::models::{QuizAttempt, Topic};
use crate::students::Student;

/// Structured payload logged for topic, quiz, progress and review events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningEventDetails {
    #[serde(default)]
    pub topic_id: Option<Uuid>,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub attempt_id: Option<Uuid>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub weak_topics: BTreeSet<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LearningEventDetails {
    pub fn for_topic(topic: &Topic) -> Self {
        Self {
            topic_id: Some(topic.topic_id),
            topic_name: Some(topic.name.clone()),
            ..Self::default()
        }
    }

    pub fn for_attempt(attempt: &QuizAttempt, topic_name: Option<&str>) -> Self {
        Self {
            topic_id: Some(attempt.topic_id),
            topic_name: topic_name.map(str::to_string),
            attempt_id: Some(attempt.attempt_id),
            score: Some(attempt.score),
            weak_topics: attempt.weak_topics.clone(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_weak_topics(mut self, weak_topics: &BTreeSet<String>) -> Self {
        self.weak_topics = weak_topics.clone();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

pub fn log_topic_created(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::TopicCreated, details)
}

pub fn log_quiz_generated(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::QuizGenerated, details)
}

pub fn log_quiz_graded(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::QuizGraded, details)
}

pub fn log_progress_updated(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::ProgressUpdated, details)
}

pub fn log_progress_stale(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::ProgressStale, details)
}

pub fn log_migration_required(student: &Student, legacy_topics: &[String]) -> Result<Uuid> {
    let details = LearningEventDetails::default()
        .with_payload(serde_json::json!({ "legacy_topics": legacy_topics }));
    log_learning_event(student, EventType::WeakTopicMigrationRequired, details)
}

pub fn log_weak_topics_migrated(student: &Student, discarded: &[String]) -> Result<Uuid> {
    let details = LearningEventDetails::default()
        .with_payload(serde_json::json!({ "discarded_legacy_topics": discarded }));
    log_learning_event(student, EventType::WeakTopicsMigrated, details)
}

pub fn log_progress_recomputed(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::ProgressRecomputed, details)
}

pub fn log_review_requested(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::ReviewRequested, details)
}

pub fn log_review_bundle_ready(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::ReviewBundleReady, details)
}

pub fn log_retake_started(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::RetakeStarted, details)
}

pub fn log_summary_superseded(student: &Student, details: LearningEventDetails) -> Result<Uuid> {
    log_learning_event(student, EventType::TopicSummarySuperseded, details)
}

fn log_learning_event(
    student: &Student,
    event_type: EventType,
    details: LearningEventDetails,
) -> Result<Uuid> {
    log_event(student, event_type, serde_json::to_value(details)?)
}
