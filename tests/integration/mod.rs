use cognitivetwin::students::{Student, StudentManager};
use std::path::Path;
use tempfile::TempDir;

pub struct IntegrationHarness {
    workspace: TempDir,
}

impl IntegrationHarness {
    pub fn new() -> Self {
        let workspace = TempDir::new().expect("failed to create temp workspace");
        Self { workspace }
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn student_manager(&self) -> StudentManager {
        StudentManager::with_root(self.workspace.path())
            .expect("failed to initialize StudentManager for tests")
    }

    pub fn create_student(&self, manager: &mut StudentManager, name: &str) -> Student {
        manager.create_student(name).expect("failed to create student")
    }
}

mod learning_flow;
mod legacy_migration;
mod progress_tracking;
pub mod support;
