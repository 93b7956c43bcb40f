pub mod decision;
pub mod generation;
pub mod grading;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod progress;
pub mod review;
pub mod storage;
pub mod students;

// Re-export commonly used types for convenience.
pub use decision::{decide, Action, Verdict, MASTERY_THRESHOLD};
pub use generation::{ContentGenerator, GenerationError, OpenAiGenerator};
pub use grading::{grade_quiz, GradeResult, GradingError};
pub use orchestration::{
    LearningOrchestrator, LearningSession, OrchestrationEvent, OrchestrationLog,
    SubmissionOutcome,
};
pub use progress::{ProgressAggregator, ProgressError};
pub use review::{FocusedReviewBundle, FocusedReviewCoordinator};
pub use students::{AppConfig, Student, StudentManager};
