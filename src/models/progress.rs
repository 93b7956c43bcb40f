//! Per-student progress record and its versioned on-disk schema.
//!
//! Version history:
//! - v1 (unversioned): `weak_topics` was either a flat list of topic names
//!   (legacy) or a map of topic name to subtopic list.
//! - v2: `schema_version` is explicit and `weak_topics` is always a map of
//!   topic name to a set of weak subtopic tags.
//!
//! A v1 map document upgrades in memory. A v1 list document is never merged
//! into; it loads as [`LoadedProgress::Legacy`] and must go through
//! [`migrate_legacy`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::decision::MASTERY_THRESHOLD;

pub const PROGRESS_SCHEMA_VERSION: u32 = 2;

/// Main-topic name to the weak subtopics seen in that topic's latest attempt.
pub type WeakTopicMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: u32,
    pub student_id: Uuid,
    pub total_topics: usize,
    pub completed_topics: usize,
    pub average_score: f64,
    #[serde(default)]
    pub weak_topics: WeakTopicMap,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn zeroed(student_id: Uuid) -> Self {
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            student_id,
            total_topics: 0,
            completed_topics: 0,
            average_score: 0.0,
            weak_topics: WeakTopicMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Replaces (never unions) the topic's weak subtopics below the mastery
    /// threshold and clears the entry at or above it.
    pub fn record_topic_result(
        &mut self,
        topic_name: &str,
        score: f64,
        weak_subtopics: &BTreeSet<String>,
    ) {
        if score < MASTERY_THRESHOLD {
            self.weak_topics
                .insert(topic_name.to_string(), weak_subtopics.clone());
        } else {
            self.weak_topics.remove(topic_name);
        }
    }
}

/// Totals recovered from a legacy document plus its flat topic list.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyProgress {
    pub student_id: Option<Uuid>,
    pub total_topics: usize,
    pub completed_topics: usize,
    pub average_score: f64,
    pub legacy_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadedProgress {
    Missing,
    Current(ProgressRecord),
    Legacy(LegacyProgress),
}

#[derive(Debug, Error)]
pub enum ProgressSchemaError {
    #[error("progress document is not valid JSON for any known schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("progress schema version {0} is newer than this build supports")]
    UnsupportedVersion(u32),
    #[error("progress schema v2 document carries a list-shaped weak topic field")]
    ListInCurrentSchema,
}

#[derive(Deserialize)]
struct ProgressDocument {
    #[serde(default = "unversioned")]
    schema_version: u32,
    #[serde(default)]
    student_id: Option<Uuid>,
    #[serde(default)]
    total_topics: usize,
    #[serde(default)]
    completed_topics: usize,
    #[serde(default)]
    average_score: f64,
    #[serde(default, alias = "weak_topics_list")]
    weak_topics: Option<WeakTopicsShape>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

const fn unversioned() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeakTopicsShape {
    Grouped(WeakTopicMap),
    Flat(Vec<String>),
}

/// Decodes a stored progress document into the current schema or a flagged
/// legacy variant.
pub fn decode_progress(
    bytes: &[u8],
    student_id: Uuid,
) -> Result<LoadedProgress, ProgressSchemaError> {
    let doc: ProgressDocument = serde_json::from_slice(bytes)?;
    if doc.schema_version > PROGRESS_SCHEMA_VERSION {
        return Err(ProgressSchemaError::UnsupportedVersion(doc.schema_version));
    }
    match doc.weak_topics {
        Some(WeakTopicsShape::Flat(legacy_topics)) => {
            if doc.schema_version == PROGRESS_SCHEMA_VERSION {
                return Err(ProgressSchemaError::ListInCurrentSchema);
            }
            Ok(LoadedProgress::Legacy(LegacyProgress {
                student_id: doc.student_id,
                total_topics: doc.total_topics,
                completed_topics: doc.completed_topics,
                average_score: doc.average_score,
                legacy_topics,
            }))
        }
        grouped => Ok(LoadedProgress::Current(ProgressRecord {
            schema_version: PROGRESS_SCHEMA_VERSION,
            student_id: doc.student_id.unwrap_or(student_id),
            total_topics: doc.total_topics,
            completed_topics: doc.completed_topics,
            average_score: doc.average_score,
            weak_topics: match grouped {
                Some(WeakTopicsShape::Grouped(map)) => map,
                _ => WeakTopicMap::new(),
            },
            updated_at: doc.updated_at.unwrap_or_else(Utc::now),
        })),
    }
}

/// Converts a legacy document into the current schema. The flat list cannot
/// be mapped onto subtopics, so the caller supplies a weak-topic map rebuilt
/// from stored attempts; the legacy names are returned for audit logging.
pub fn migrate_legacy(
    legacy: LegacyProgress,
    student_id: Uuid,
    rebuilt: WeakTopicMap,
) -> (ProgressRecord, Vec<String>) {
    let record = ProgressRecord {
        schema_version: PROGRESS_SCHEMA_VERSION,
        student_id: legacy.student_id.unwrap_or(student_id),
        total_topics: legacy.total_topics,
        completed_topics: legacy.completed_topics,
        average_score: legacy.average_score,
        weak_topics: rebuilt,
        updated_at: Utc::now(),
    };
    (record, legacy.legacy_topics)
}
