pub mod events;
pub mod pipeline;
pub mod session;

pub use events::LearningEventDetails;
pub use pipeline::{LearningOrchestrator, ProgressIssue, SubmissionOutcome};
pub use session::LearningSession;

use crate::storage::{append_jsonl, read_jsonl};
use crate::students::{Student, StudentLayout};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Kinds of entries in a student's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StudentCreated,
    StudentSelected,
    TopicCreated,
    QuizGenerated,
    QuizGraded,
    ProgressUpdated,
    ProgressStale,
    WeakTopicMigrationRequired,
    WeakTopicsMigrated,
    ProgressRecomputed,
    ReviewRequested,
    ReviewBundleReady,
    RetakeStarted,
    TopicSummarySuperseded,
}

/// One line of `events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationEvent {
    pub event_id: Uuid,
    pub student_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Append-only event log for one student.
pub struct OrchestrationLog {
    events_path: PathBuf,
}

impl OrchestrationLog {
    pub fn for_student(student: &Student) -> Self {
        Self {
            events_path: StudentLayout::new(student).events_path,
        }
    }

    pub fn append_event(&self, event: &OrchestrationEvent) -> Result<()> {
        append_jsonl(&self.events_path, event)
    }

    pub fn load_events(&self) -> Result<Vec<OrchestrationEvent>> {
        read_jsonl(&self.events_path)
    }

    pub fn events_of_type(&self, event_type: EventType) -> Result<Vec<OrchestrationEvent>> {
        Ok(self
            .load_events()?
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect())
    }
}

/// Appends an event stamped with a fresh id and the current time.
pub fn log_event(
    student: &Student,
    event_type: EventType,
    details: serde_json::Value,
) -> Result<Uuid> {
    let event = OrchestrationEvent {
        event_id: Uuid::new_v4(),
        student_id: student.id,
        event_type,
        timestamp: Utc::now(),
        details,
    };
    OrchestrationLog::for_student(student).append_event(&event)?;
    Ok(event.event_id)
}
