//! Focused review: narrowed study material for the subtopics a student
//! missed, plus the remediation cycle that wraps it.
//!
//! Generation calls run on worker threads and are abandoned once their
//! deadline passes. A failed or abandoned call leaves its field empty in the
//! bundle instead of failing the review.

pub mod cycle;

pub use cycle::{CycleState, RemediationCycle, RemediationError};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::generation::{ContentGenerator, GenerationError};
use crate::models::Flashcard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewField {
    Summary,
    Flashcards,
    Mindmap,
}

impl ReviewField {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewField::Summary => "summary",
            ReviewField::Flashcards => "flashcards",
            ReviewField::Mindmap => "mind map",
        }
    }
}

/// Narrowed material for one topic's weak subtopics. Held only for the
/// duration of a retake cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusedReviewBundle {
    pub topic_name: String,
    pub weak_subtopics: BTreeSet<String>,
    pub summary: Option<String>,
    pub flashcards: Option<Vec<Flashcard>>,
    pub mindmap: Option<String>,
    /// Reason each missing field could not be produced.
    #[serde(default)]
    pub failures: BTreeMap<ReviewField, String>,
    pub generated_at: DateTime<Utc>,
}

impl FocusedReviewBundle {
    pub fn missing_fields(&self) -> Vec<ReviewField> {
        let mut missing = Vec::new();
        if self.summary.is_none() {
            missing.push(ReviewField::Summary);
        }
        if self.flashcards.is_none() {
            missing.push(ReviewField::Flashcards);
        }
        if self.mindmap.is_none() {
            missing.push(ReviewField::Mindmap);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Text to show in place of a field that could not be generated.
    pub fn fallback_message(&self, field: ReviewField) -> String {
        match field {
            ReviewField::Summary => format!(
                "A focused summary for {} could not be generated. Review the original summary, \
                 paying attention to: {}.",
                self.topic_name,
                join(&self.weak_subtopics)
            ),
            other => format!(
                "Focused {} for {} are unavailable right now. Use the focused summary to review {}.",
                other.label(),
                self.topic_name,
                join(&self.weak_subtopics)
            ),
        }
    }
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// A generation call running on a worker thread.
pub struct PendingCall<T> {
    rx: mpsc::Receiver<Result<T, GenerationError>>,
    started: Instant,
    timeout: Duration,
}

impl<T> PendingCall<T> {
    /// Waits for the result until the call's deadline. On timeout the worker
    /// is detached and its eventual result dropped.
    pub fn wait(self) -> Result<T, GenerationError> {
        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        match self.rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(GenerationError::TimedOut(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(GenerationError::WorkerLost),
        }
    }
}

/// Starts `call` on a named worker thread with a deadline of `timeout`.
pub fn spawn_with_deadline<T, F>(name: &str, timeout: Duration, call: F) -> PendingCall<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("generation-{name}"))
        .spawn(move || {
            // The receiver is gone once the caller gave up waiting.
            let _ = tx.send(call());
        });
    if let Err(err) = spawned {
        warn!(call = name, error = %err, "failed to spawn generation worker");
    }
    PendingCall {
        rx,
        started: Instant::now(),
        timeout,
    }
}

/// Runs `call` on a worker thread and waits at most `timeout` for it.
pub fn run_with_deadline<T, F>(name: &str, timeout: Duration, call: F) -> Result<T, GenerationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
{
    spawn_with_deadline(name, timeout, call).wait()
}

pub struct FocusedReviewCoordinator {
    generator: Arc<dyn ContentGenerator>,
    call_timeout: Duration,
}

impl FocusedReviewCoordinator {
    pub fn new(generator: Arc<dyn ContentGenerator>, call_timeout: Duration) -> Self {
        Self {
            generator,
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Narrows `topic_summary` to `weak_subtopics`, then derives flashcards
    /// and a mindmap from the narrowed summary. Never fails; missing pieces
    /// are recorded in [`FocusedReviewBundle::failures`].
    pub fn build_focused_review(
        &self,
        topic_name: &str,
        topic_summary: &str,
        weak_subtopics: &BTreeSet<String>,
    ) -> FocusedReviewBundle {
        let mut bundle = FocusedReviewBundle {
            topic_name: topic_name.to_string(),
            weak_subtopics: weak_subtopics.clone(),
            summary: None,
            flashcards: None,
            mindmap: None,
            failures: BTreeMap::new(),
            generated_at: Utc::now(),
        };

        let generator = Arc::clone(&self.generator);
        let original = topic_summary.to_string();
        let weak = weak_subtopics.clone();
        let summary = match run_with_deadline("narrow-summary", self.call_timeout, move || {
            generator.narrow_summary(&original, &weak)
        }) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(topic = topic_name, error = %err, "focused summary generation failed");
                let reason = format!("focused summary unavailable: {err}");
                bundle.failures.insert(ReviewField::Summary, err.to_string());
                bundle.failures.insert(ReviewField::Flashcards, reason.clone());
                bundle.failures.insert(ReviewField::Mindmap, reason);
                return bundle;
            }
        };

        let generator = Arc::clone(&self.generator);
        let source = summary.clone();
        let flashcards = spawn_with_deadline("flashcards", self.call_timeout, move || {
            generator.generate_flashcards(&source)
        });
        let generator = Arc::clone(&self.generator);
        let source = summary.clone();
        let mindmap = spawn_with_deadline("mindmap", self.call_timeout, move || {
            generator.generate_mindmap(&source)
        });
        bundle.summary = Some(summary);

        match flashcards.wait() {
            Ok(cards) => bundle.flashcards = Some(cards),
            Err(err) => {
                warn!(topic = topic_name, error = %err, "focused flashcard generation failed");
                bundle.failures.insert(ReviewField::Flashcards, err.to_string());
            }
        }
        match mindmap.wait() {
            Ok(markdown) => bundle.mindmap = Some(markdown),
            Err(err) => {
                warn!(topic = topic_name, error = %err, "focused mindmap generation failed");
                bundle.failures.insert(ReviewField::Mindmap, err.to_string());
            }
        }

        if bundle.is_complete() {
            info!(topic = topic_name, weak = weak_subtopics.len(), "focused review ready");
        } else {
            debug!(topic = topic_name, missing = ?bundle.missing_fields(), "focused review is partial");
        }
        bundle
    }
}
