//! Remediation cycle for one topic within a session.
//!
//! ```text
//! Idle ──grade──▶ Graded(<70) ──▶ ReviewBundleRequested ──▶ ReviewBundleReady
//!   ▲                 ▲                                            │
//!   │                 └────────grade──── RetakeQuizRequested ◀─────┘
//!   └──▶ Advanced (any grade ≥ 70)
//! ```
//!
//! The number of rounds is counted but never limited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::{classify, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Graded { score: f64 },
    ReviewBundleRequested,
    ReviewBundleReady,
    RetakeQuizRequested,
    Advanced { score: f64 },
}

impl CycleState {
    pub fn name(&self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Graded { .. } => "graded",
            CycleState::ReviewBundleRequested => "review_bundle_requested",
            CycleState::ReviewBundleReady => "review_bundle_ready",
            CycleState::RetakeQuizRequested => "retake_quiz_requested",
            CycleState::Advanced { .. } => "advanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemediationError {
    #[error("cannot {action} while the remediation cycle is {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationCycle {
    state: CycleState,
    rounds: u32,
    weak_subtopics: BTreeSet<String>,
}

impl Default for RemediationCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationCycle {
    pub fn new() -> Self {
        Self {
            state: CycleState::Idle,
            rounds: 0,
            weak_subtopics: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Completed review-and-retake rounds.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Weak subtopics of the most recent graded attempt.
    pub fn weak_subtopics(&self) -> &BTreeSet<String> {
        &self.weak_subtopics
    }

    /// Whether a new quiz may be handed out in the current state.
    pub fn accepts_quiz(&self) -> bool {
        matches!(
            self.state,
            CycleState::Idle | CycleState::RetakeQuizRequested | CycleState::Advanced { .. }
        )
    }

    pub fn ensure_accepts_quiz(&self, action: &'static str) -> Result<(), RemediationError> {
        if self.accepts_quiz() {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    /// Records a graded attempt. The weak subtopics are replaced by the new
    /// attempt's set.
    pub fn record_grade(
        &mut self,
        score: f64,
        weak_subtopics: &BTreeSet<String>,
    ) -> Result<Verdict, RemediationError> {
        self.ensure_accepts_quiz("record a grade")?;
        if self.state == CycleState::RetakeQuizRequested {
            self.rounds += 1;
        }
        let verdict = classify(score);
        self.weak_subtopics = weak_subtopics.clone();
        self.state = match verdict {
            Verdict::Review => CycleState::Graded { score },
            Verdict::Advance => CycleState::Advanced { score },
        };
        Ok(verdict)
    }

    pub fn request_review(&mut self) -> Result<(), RemediationError> {
        match self.state {
            CycleState::Graded { .. } => {
                self.state = CycleState::ReviewBundleRequested;
                Ok(())
            }
            _ => Err(self.invalid("request a review")),
        }
    }

    pub fn mark_bundle_ready(&mut self) -> Result<(), RemediationError> {
        match self.state {
            CycleState::ReviewBundleRequested => {
                self.state = CycleState::ReviewBundleReady;
                Ok(())
            }
            _ => Err(self.invalid("accept a review bundle")),
        }
    }

    pub fn request_retake(&mut self) -> Result<(), RemediationError> {
        match self.state {
            CycleState::ReviewBundleReady => {
                self.state = CycleState::RetakeQuizRequested;
                Ok(())
            }
            _ => Err(self.invalid("start a retake")),
        }
    }

    fn invalid(&self, action: &'static str) -> RemediationError {
        RemediationError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
