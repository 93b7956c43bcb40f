use super::super::IntegrationHarness;
use super::generator::ScriptedGenerator;
use anyhow::Result;
use cognitivetwin::models::{AnswerSheet, LoadedProgress, ProgressRecord, SourceKind};
use cognitivetwin::orchestration::{LearningOrchestrator, LearningSession};
use cognitivetwin::storage::LearningStore;
use cognitivetwin::students::{AppConfig, Student, StudentLayout, StudentManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const THERMO_TEXT: &str = "Thermodynamics studies heat, work and energy. \
The second law introduces entropy, a measure of disorder that never decreases \
in an isolated system.";

pub struct StudentFixture {
    harness: IntegrationHarness,
    pub manager: StudentManager,
    pub student: Student,
    pub generator: Arc<ScriptedGenerator>,
}

impl StudentFixture {
    pub fn new(student_name: &str) -> Self {
        Self::with_generator(student_name, ScriptedGenerator::new())
    }

    pub fn with_generator(student_name: &str, generator: ScriptedGenerator) -> Self {
        let harness = IntegrationHarness::new();
        let mut manager = harness.student_manager();
        let student = harness.create_student(&mut manager, student_name);
        Self {
            harness,
            manager,
            student,
            generator: Arc::new(generator),
        }
    }

    pub fn workspace(&self) -> PathBuf {
        self.harness.workspace_path().to_path_buf()
    }

    pub fn layout(&self) -> StudentLayout {
        StudentLayout::new(&self.student)
    }

    pub fn store(&self) -> LearningStore<'_> {
        LearningStore::new(&self.student)
    }

    pub fn orchestrator(&self) -> LearningOrchestrator {
        self.orchestrator_with_timeout(Duration::from_secs(5))
    }

    pub fn orchestrator_with_timeout(&self, call_timeout: Duration) -> LearningOrchestrator {
        let mut config = AppConfig::default();
        config.generation.call_timeout = call_timeout;
        LearningOrchestrator::new(self.generator.clone(), &config)
    }

    pub fn start_topic(&self, orchestrator: &LearningOrchestrator, name: &str) -> Result<LearningSession> {
        orchestrator.start_topic(&self.student, name, SourceKind::TypedText, THERMO_TEXT)
    }

    pub fn progress(&self) -> ProgressRecord {
        match self.store().load_progress().expect("progress should load") {
            LoadedProgress::Current(record) => record,
            other => panic!("expected a current progress record, got {other:?}"),
        }
    }
}

/// Answers a 20-question all-`True` quiz so that exactly `correct` answers
/// are right.
pub fn answers_scoring(correct: usize) -> AnswerSheet {
    AnswerSheet::from(
        (0..20)
            .map(|idx| Some(if idx < correct { "True" } else { "False" }.to_string()))
            .collect::<Vec<_>>(),
    )
}
