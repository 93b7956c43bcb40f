//! Decision policy: review or advance after a graded attempt.
//!
//! Always evaluated fresh from the latest score; nothing here is cached.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Inclusive lower bound for advancing.
pub const MASTERY_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Review,
    Advance,
}

pub fn classify(score: f64) -> Verdict {
    if score >= MASTERY_THRESHOLD {
        Verdict::Advance
    } else {
        Verdict::Review
    }
}

/// Context the policy attaches to its action.
#[derive(Debug, Clone)]
pub struct DecisionInput<'a> {
    pub student_name: &'a str,
    pub topic_name: &'a str,
    pub weak_topics: &'a BTreeSet<String>,
}

/// What the navigation layer should do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Review {
        topic: String,
        weak_topics: BTreeSet<String>,
    },
    Advance {
        student: String,
        message: String,
    },
}

impl Action {
    pub fn verdict(&self) -> Verdict {
        match self {
            Action::Review { .. } => Verdict::Review,
            Action::Advance { .. } => Verdict::Advance,
        }
    }
}

pub fn decide(score: f64, input: &DecisionInput<'_>) -> Action {
    match classify(score) {
        Verdict::Review => Action::Review {
            topic: input.topic_name.to_string(),
            weak_topics: input.weak_topics.clone(),
        },
        Verdict::Advance => Action::Advance {
            student: input.student_name.to_string(),
            message: format!(
                "Excellent work, {}! You've mastered {}. You're ready to start a new topic.",
                input.student_name, input.topic_name
            ),
        },
    }
}
