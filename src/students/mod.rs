mod config;
pub mod layout;

pub use config::{
    config_file_path, ensure_workspace_structure, load_or_default, save, workspace_root, AppConfig,
    GenerationSettings, LoggingSettings, QuizSettings, WorkspacePaths, CONFIG_FILE_NAME,
};
pub use layout::StudentLayout;

use crate::models::ProgressRecord;
use crate::orchestration::{log_event, EventType};
use crate::storage::LearningStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// A learner and the directory holding everything recorded for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub data_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Manages students, configuration, and the workspace root.
pub struct StudentManager {
    pub config: AppConfig,
    pub paths: WorkspacePaths,
    pub config_path: PathBuf,
}

impl StudentManager {
    /// Opens the workspace resolved from `COGNITIVETWIN_HOME` or the OS data directory.
    pub fn new() -> Result<Self> {
        let root = workspace_root()?;
        Self::with_root(&root)
    }

    /// Opens (and creates if needed) a workspace rooted at `root`.
    pub fn with_root(root: &Path) -> Result<Self> {
        let paths = ensure_workspace_structure(root)?;
        let mut config = load_or_default(root)?;
        let config_path = config_file_path(root);

        // If no last active student, try to pick the first existing one.
        if config.last_active_student_id.is_none() {
            if let Some(first) = Self::discover_students(&paths)?.first() {
                config.last_active_student_id = Some(first.id.to_string());
                save(root, &config)?;
            }
        }

        Ok(Self {
            config,
            paths,
            config_path,
        })
    }

    fn discover_students(paths: &WorkspacePaths) -> Result<Vec<Student>> {
        let mut students = Vec::new();
        if paths.students_dir.exists() {
            for entry in fs::read_dir(&paths.students_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    let metadata = entry.path().join(layout::STUDENT_FILE);
                    if metadata.exists() {
                        let student: Student = serde_json::from_slice(&fs::read(&metadata)?)
                            .with_context(|| format!("Failed to parse {}", metadata.display()))?;
                        students.push(student);
                    }
                }
            }
        }
        students.sort_by_key(|s| s.created_at);
        Ok(students)
    }

    pub fn list_students(&self) -> Result<Vec<Student>> {
        Self::discover_students(&self.paths)
    }

    pub fn get_student(&self, student_id: &Uuid) -> Result<Option<Student>> {
        Ok(self
            .list_students()?
            .into_iter()
            .find(|s| &s.id == student_id))
    }

    /// Creates a student directory with a zeroed progress record and makes it active.
    pub fn create_student(&mut self, name: &str) -> Result<Student> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let student = Student {
            id,
            name: name.to_string(),
            slug: slugify(name),
            data_path: self.paths.student_dir(&id.to_string()),
            created_at,
            last_active_at: Some(created_at),
        };
        StudentLayout::new(&student).ensure_dirs()?;
        self.persist_student(&student)?;
        LearningStore::new(&student).save_progress(&ProgressRecord::zeroed(student.id))?;
        log_event(
            &student,
            EventType::StudentCreated,
            serde_json::json!({ "student_id": student.id, "name": student.name }),
        )?;
        info!(student_id = %student.id, name = %student.name, "student created");
        self.set_active_student(&student.id)?;
        Ok(student)
    }

    fn persist_student(&self, student: &Student) -> Result<()> {
        let metadata_path = student.data_path.join(layout::STUDENT_FILE);
        fs::create_dir_all(&student.data_path)?;
        fs::write(metadata_path, serde_json::to_vec_pretty(student)?)?;
        Ok(())
    }

    pub fn set_active_student(&mut self, student_id: &Uuid) -> Result<()> {
        self.config.last_active_student_id = Some(student_id.to_string());
        if let Some(mut student) = self.get_student(student_id)? {
            student.last_active_at = Some(Utc::now());
            self.persist_student(&student)?;
            log_event(
                &student,
                EventType::StudentSelected,
                serde_json::json!({ "student_id": student.id, "name": student.name }),
            )?;
        }
        save(&self.paths.root, &self.config)?;
        Ok(())
    }

    pub fn active_student(&self) -> Result<Option<Student>> {
        match &self.config.last_active_student_id {
            Some(id) => {
                let uuid =
                    Uuid::parse_str(id).context("Invalid last_active_student_id in config")?;
                self.get_student(&uuid)
            }
            None => Ok(None),
        }
    }

    /// Storage handle scoped to one student.
    pub fn store<'a>(&self, student: &'a Student) -> LearningStore<'a> {
        LearningStore::new(student)
    }
}

/// Create a filesystem-safe slug from a student name.
fn slugify(name: &str) -> String {
    let mut slug = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}
