//! Pure re-aggregation of progress totals from stored topics and attempts.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::MASTERY_THRESHOLD;
use crate::models::{ProgressRecord, QuizAttempt, Topic, WeakTopicMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressTotals {
    pub total_topics: usize,
    pub completed_topics: usize,
    pub average_score: f64,
}

impl ProgressTotals {
    pub fn apply_to(&self, record: &mut ProgressRecord) {
        record.total_topics = self.total_topics;
        record.completed_topics = self.completed_topics;
        record.average_score = self.average_score;
    }
}

/// Derives the totals from the topic list and full attempt history.
///
/// `total_topics` counts every started topic whether or not it was quizzed.
/// `average_score` is the lifetime mean over every attempt. `completed_topics`
/// counts topics whose best attempt reached the mastery threshold.
pub fn recompute(topics: &[Topic], attempts: &[QuizAttempt]) -> ProgressTotals {
    let average_score = if attempts.is_empty() {
        0.0
    } else {
        attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64
    };
    ProgressTotals {
        total_topics: topics.len(),
        completed_topics: best_scores(attempts)
            .values()
            .filter(|best| **best >= MASTERY_THRESHOLD)
            .count(),
        average_score,
    }
}

/// Highest score per topic identifier.
pub fn best_scores(attempts: &[QuizAttempt]) -> HashMap<Uuid, f64> {
    let mut best: HashMap<Uuid, f64> = HashMap::new();
    for attempt in attempts {
        best.entry(attempt.topic_id)
            .and_modify(|score| *score = score.max(attempt.score))
            .or_insert(attempt.score);
    }
    best
}

/// Rebuilds the weak-topic map from the most recent attempt of each topic.
/// Attempts for topics that no longer exist are skipped since their name
/// cannot be resolved.
pub fn rebuild_weak_topics(topics: &[Topic], attempts: &[QuizAttempt]) -> WeakTopicMap {
    let names: HashMap<Uuid, &str> = topics
        .iter()
        .map(|t| (t.topic_id, t.name.as_str()))
        .collect();
    let mut latest: BTreeMap<Uuid, &QuizAttempt> = BTreeMap::new();
    for attempt in attempts {
        match latest.get(&attempt.topic_id) {
            Some(existing) if existing.taken_at > attempt.taken_at => {}
            _ => {
                latest.insert(attempt.topic_id, attempt);
            }
        }
    }
    let mut map = WeakTopicMap::new();
    for (topic_id, attempt) in latest {
        let Some(name) = names.get(&topic_id) else {
            continue;
        };
        if attempt.score < MASTERY_THRESHOLD {
            map.insert(name.to_string(), attempt.weak_topics.clone());
        }
    }
    map
}
