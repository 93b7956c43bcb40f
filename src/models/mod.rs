pub mod progress;
pub mod quiz;
pub mod topic;

pub use progress::{
    decode_progress, migrate_legacy, LegacyProgress, LoadedProgress, ProgressRecord,
    ProgressSchemaError, WeakTopicMap, PROGRESS_SCHEMA_VERSION,
};
pub use quiz::{
    split_option_label, AnswerSheet, MultipleChoice, Question, Quiz, QuizAttempt, QuizDefect,
    ShortAnswer, TrueFalse, TruthValue,
};
pub use topic::{Flashcard, SourceKind, StudyMaterials, Topic};
