//! Filesystem layout helpers for per-student storage.
//!
//! Every artifact for a student lives under that student's directory. The
//! file names are centralized here so storage and orchestration modules do
//! not duplicate string constants.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::Student;

/// Student metadata document.
pub const STUDENT_FILE: &str = "student.json";
/// Directory holding one JSON document per topic.
pub const TOPICS_SUBDIR: &str = "topics";
/// Directory holding derived study materials keyed by topic id.
pub const MATERIALS_SUBDIR: &str = "materials";
/// Append-only log of graded quiz attempts.
pub const ATTEMPTS_FILE: &str = "attempts.jsonl";
/// Singleton progress record.
pub const PROGRESS_FILE: &str = "progress.json";
/// Orchestration event log.
pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Clone)]
pub struct StudentLayout {
    pub root: PathBuf,
    pub topics_dir: PathBuf,
    pub materials_dir: PathBuf,
    pub attempts_path: PathBuf,
    pub progress_path: PathBuf,
    pub events_path: PathBuf,
}

impl StudentLayout {
    pub fn new(student: &Student) -> Self {
        let root = student.data_path.clone();
        Self {
            topics_dir: root.join(TOPICS_SUBDIR),
            materials_dir: root.join(MATERIALS_SUBDIR),
            attempts_path: root.join(ATTEMPTS_FILE),
            progress_path: root.join(PROGRESS_FILE),
            events_path: root.join(EVENTS_FILE),
            root,
        }
    }

    pub fn topic_json(&self, topic_id: &str) -> PathBuf {
        self.topics_dir.join(format!("{topic_id}.json"))
    }

    pub fn materials_json(&self, topic_id: &str) -> PathBuf {
        self.materials_dir.join(format!("{topic_id}.json"))
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.root, &self.topics_dir, &self.materials_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create student directory {}", dir.display()))?;
        }
        Ok(())
    }
}
