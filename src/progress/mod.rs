//! Progress aggregation: folds graded attempts into the per-student
//! progress record.
//!
//! Stored attempts are the source of truth. The record's totals are always
//! recomputed from the full attempt history, so a stale or damaged record
//! heals on the next update or via [`ProgressAggregator::recompute`].

pub mod aggregate;
pub mod insights;

pub use aggregate::{best_scores, rebuild_weak_topics, recompute, ProgressTotals};
pub use insights::{activity_streak, daily_activity, score_history, topic_mastery, TopicMastery};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::grading::GradeResult;
use crate::models::{migrate_legacy, LoadedProgress, ProgressRecord};
use crate::orchestration::events::{
    log_progress_recomputed, log_weak_topics_migrated, LearningEventDetails,
};
use crate::storage::LearningStore;
use crate::students::Student;

#[derive(Debug, Error)]
pub enum ProgressError {
    /// The stored record uses the flat weak-topic list and must be migrated
    /// before it can be updated.
    #[error("progress record uses the legacy weak-topic list ({} topics); migration required", .legacy_topics.len())]
    MigrationRequired { legacy_topics: Vec<String> },
    #[error("failed to load progress state: {0:#}")]
    Load(anyhow::Error),
    #[error("failed to persist progress record: {0:#}")]
    Persistence(anyhow::Error),
}

/// Non-fatal conditions raised while updating progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressWarning {
    /// The topic could not be resolved, so its weak-topic entry was left as is.
    TopicNameMissing { topic_id: Uuid },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub record: ProgressRecord,
    pub warnings: Vec<ProgressWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub record: ProgressRecord,
    pub discarded_legacy_topics: Vec<String>,
}

pub struct ProgressAggregator<'a> {
    store: LearningStore<'a>,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(student: &'a Student) -> Self {
        Self {
            store: LearningStore::new(student),
        }
    }

    pub fn store(&self) -> &LearningStore<'a> {
        &self.store
    }

    /// Folds a graded attempt into the progress record. The attempt must
    /// already be stored, since totals are derived from the attempt log.
    pub fn update_progress(
        &self,
        topic_id: &Uuid,
        grade: &GradeResult,
    ) -> Result<ProgressUpdate, ProgressError> {
        let student_id = self.store.student().id;
        let mut record = self.load_current()?;

        let topics = self.store.list_topics().map_err(ProgressError::Load)?;
        let attempts = self.store.load_attempts().map_err(ProgressError::Load)?;
        aggregate::recompute(&topics, &attempts).apply_to(&mut record);

        let mut warnings = Vec::new();
        match topics.iter().find(|t| &t.topic_id == topic_id) {
            Some(topic) => record.record_topic_result(&topic.name, grade.score, &grade.weak_topics),
            None => {
                warn!(%student_id, %topic_id, "topic not found; skipping weak topic update");
                warnings.push(ProgressWarning::TopicNameMissing {
                    topic_id: *topic_id,
                });
            }
        }
        record.updated_at = Utc::now();

        self.store
            .save_progress(&record)
            .map_err(ProgressError::Persistence)?;
        debug!(
            %student_id,
            total_topics = record.total_topics,
            completed_topics = record.completed_topics,
            average_score = record.average_score,
            "progress updated"
        );
        Ok(ProgressUpdate { record, warnings })
    }

    /// Converts a legacy record to the current schema, rebuilding the
    /// weak-topic map from stored attempts. Returns `None` when nothing needed
    /// migrating.
    pub fn migrate_legacy(&self) -> Result<Option<MigrationReport>, ProgressError> {
        let legacy = match self.store.load_progress().map_err(ProgressError::Load)? {
            LoadedProgress::Legacy(legacy) => legacy,
            _ => return Ok(None),
        };
        let student = self.store.student();
        let topics = self.store.list_topics().map_err(ProgressError::Load)?;
        let attempts = self.store.load_attempts().map_err(ProgressError::Load)?;
        let rebuilt = rebuild_weak_topics(&topics, &attempts);
        let (mut record, discarded) = migrate_legacy(legacy, student.id, rebuilt);
        aggregate::recompute(&topics, &attempts).apply_to(&mut record);

        self.store
            .save_progress(&record)
            .map_err(ProgressError::Persistence)?;
        if let Err(err) = log_weak_topics_migrated(student, &discarded) {
            warn!(student_id = %student.id, error = %err, "failed to log migration event");
        }
        info!(
            student_id = %student.id,
            discarded = discarded.len(),
            "legacy weak topics migrated"
        );
        Ok(Some(MigrationReport {
            record,
            discarded_legacy_topics: discarded,
        }))
    }

    /// Rebuilds the whole record, weak-topic map included, from stored
    /// topics and attempts.
    pub fn recompute(&self) -> Result<ProgressRecord, ProgressError> {
        let mut record = self.load_current()?;
        let topics = self.store.list_topics().map_err(ProgressError::Load)?;
        let attempts = self.store.load_attempts().map_err(ProgressError::Load)?;
        aggregate::recompute(&topics, &attempts).apply_to(&mut record);
        record.weak_topics = rebuild_weak_topics(&topics, &attempts);
        record.updated_at = Utc::now();

        self.store
            .save_progress(&record)
            .map_err(ProgressError::Persistence)?;
        let student = self.store.student();
        let details = LearningEventDetails::default().with_payload(serde_json::json!({
            "total_topics": record.total_topics,
            "completed_topics": record.completed_topics,
            "average_score": record.average_score,
            "attempts": attempts.len(),
        }));
        if let Err(err) = log_progress_recomputed(student, details) {
            warn!(student_id = %student.id, error = %err, "failed to log recompute event");
        }
        Ok(record)
    }

    fn load_current(&self) -> Result<ProgressRecord, ProgressError> {
        match self.store.load_progress().map_err(ProgressError::Load)? {
            LoadedProgress::Missing => Ok(ProgressRecord::zeroed(self.store.student().id)),
            LoadedProgress::Current(record) => Ok(record),
            LoadedProgress::Legacy(legacy) => Err(ProgressError::MigrationRequired {
                legacy_topics: legacy.legacy_topics,
            }),
        }
    }
}
