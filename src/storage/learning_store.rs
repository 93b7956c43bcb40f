use std::fs;

use anyhow::{Context, Result};
use uuid::Uuid;

use super::{append_jsonl, read_json, read_jsonl, write_json};
use crate::models::{decode_progress, LoadedProgress, ProgressRecord, QuizAttempt, StudyMaterials, Topic};
use crate::students::{Student, StudentLayout};

/// Topic, attempt, and progress persistence for one student.
pub struct LearningStore<'a> {
    student: &'a Student,
    layout: StudentLayout,
}

impl<'a> LearningStore<'a> {
    pub fn new(student: &'a Student) -> Self {
        Self {
            student,
            layout: StudentLayout::new(student),
        }
    }

    pub fn student(&self) -> &Student {
        self.student
    }

    pub fn layout(&self) -> &StudentLayout {
        &self.layout
    }

    pub fn save_topic(&self, topic: &Topic) -> Result<()> {
        write_json(&self.layout.topic_json(&topic.topic_id.to_string()), topic)
    }

    pub fn load_topic(&self, topic_id: &Uuid) -> Result<Option<Topic>> {
        read_json(&self.layout.topic_json(&topic_id.to_string()))
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut topics = Vec::new();
        if self.layout.topics_dir.exists() {
            for entry in fs::read_dir(&self.layout.topics_dir)? {
                let path = entry?.path();
                if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                    if let Some(topic) = read_json::<Topic>(&path)? {
                        topics.push(topic);
                    }
                }
            }
        }
        topics.sort_by_key(|t| t.created_at);
        Ok(topics)
    }

    /// Removes a topic and its materials. Attempts stay in the log.
    pub fn delete_topic(&self, topic_id: &Uuid) -> Result<bool> {
        let path = self.layout.topic_json(&topic_id.to_string());
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        let materials = self.layout.materials_json(&topic_id.to_string());
        if materials.exists() {
            fs::remove_file(&materials)
                .with_context(|| format!("Failed to delete {}", materials.display()))?;
        }
        Ok(true)
    }

    pub fn topic_name(&self, topic_id: &Uuid) -> Result<Option<String>> {
        Ok(self.load_topic(topic_id)?.map(|t| t.name))
    }

    pub fn save_materials(&self, materials: &StudyMaterials) -> Result<()> {
        write_json(
            &self.layout.materials_json(&materials.topic_id.to_string()),
            materials,
        )
    }

    pub fn load_materials(&self, topic_id: &Uuid) -> Result<Option<StudyMaterials>> {
        read_json(&self.layout.materials_json(&topic_id.to_string()))
    }

    /// Durably appends a graded attempt. Returns only after the line is on disk.
    pub fn append_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        append_jsonl(&self.layout.attempts_path, attempt)
            .with_context(|| format!("Failed to record attempt {}", attempt.attempt_id))
    }

    /// All attempts in the order they were recorded.
    pub fn load_attempts(&self) -> Result<Vec<QuizAttempt>> {
        read_jsonl(&self.layout.attempts_path)
    }

    pub fn attempts_for_topic(&self, topic_id: &Uuid) -> Result<Vec<QuizAttempt>> {
        Ok(self
            .load_attempts()?
            .into_iter()
            .filter(|a| &a.topic_id == topic_id)
            .collect())
    }

    pub fn load_progress(&self) -> Result<LoadedProgress> {
        let path = &self.layout.progress_path;
        if !path.exists() {
            return Ok(LoadedProgress::Missing);
        }
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        decode_progress(&bytes, self.student.id)
            .with_context(|| format!("Failed to decode {}", path.display()))
    }

    pub fn save_progress(&self, record: &ProgressRecord) -> Result<()> {
        write_json(&self.layout.progress_path, record)
    }
}
