use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the raw study text for a topic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    TypedText,
    Document,
    ScannedDocument,
    CatalogPick,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::TypedText => "typed text",
            SourceKind::Document => "document",
            SourceKind::ScannedDocument => "scanned document",
            SourceKind::CatalogPick => "catalog pick",
        }
    }
}

/// A unit of study content owned by one student.
///
/// `summary` is the canonical text every derived artifact (mindmap,
/// flashcards, formula sheet, quiz) is generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: Uuid,
    pub student_id: Uuid,
    pub name: String,
    pub source_kind: SourceKind,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    /// Bumped each time a focused review replaces the summary.
    #[serde(default)]
    pub summary_revision: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Topic {
    pub fn new(
        student_id: Uuid,
        name: impl Into<String>,
        source_kind: SourceKind,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            topic_id: Uuid::new_v4(),
            student_id,
            name: name.into(),
            source_kind,
            created_at: Utc::now(),
            summary: summary.into(),
            summary_revision: 0,
            updated_at: None,
        }
    }

    pub fn supersede_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
        self.summary_revision += 1;
        self.updated_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub keyword: String,
    pub definition: String,
}

/// Material derived from a topic summary, stored next to the topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyMaterials {
    pub topic_id: Uuid,
    #[serde(default)]
    pub mindmap: Option<String>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub formula_sheet: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StudyMaterials {
    pub fn empty(topic_id: Uuid) -> Self {
        Self {
            topic_id,
            mindmap: None,
            flashcards: Vec::new(),
            formula_sheet: None,
            updated_at: Utc::now(),
        }
    }
}
