//! Dashboard views derived from stored attempts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::{classify, Verdict};
use crate::models::{QuizAttempt, Topic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMastery {
    pub topic_id: Uuid,
    pub topic_name: String,
    pub best_score: f64,
    pub attempts: usize,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// `None` until the topic has been quizzed.
    pub verdict: Option<Verdict>,
}

/// Best score, attempt count and latest activity for every topic, in topic
/// creation order.
pub fn topic_mastery(topics: &[Topic], attempts: &[QuizAttempt]) -> Vec<TopicMastery> {
    topics
        .iter()
        .map(|topic| {
            let own: Vec<&QuizAttempt> = attempts
                .iter()
                .filter(|a| a.topic_id == topic.topic_id)
                .collect();
            let best = own.iter().map(|a| a.score).fold(None, |acc: Option<f64>, s| {
                Some(acc.map_or(s, |b| b.max(s)))
            });
            TopicMastery {
                topic_id: topic.topic_id,
                topic_name: topic.name.clone(),
                best_score: best.unwrap_or(0.0),
                attempts: own.len(),
                last_attempt_at: own.iter().map(|a| a.taken_at).max(),
                verdict: best.map(classify),
            }
        })
        .collect()
}

/// Scores for one topic, oldest first.
pub fn score_history(attempts: &[QuizAttempt], topic_id: &Uuid) -> Vec<(DateTime<Utc>, f64)> {
    let mut history: Vec<(DateTime<Utc>, f64)> = attempts
        .iter()
        .filter(|a| &a.topic_id == topic_id)
        .map(|a| (a.taken_at, a.score))
        .collect();
    history.sort_by_key(|(taken_at, _)| *taken_at);
    history
}

/// Attempts per calendar day (UTC) over the last `days` days ending at `today`.
pub fn daily_activity(
    attempts: &[QuizAttempt],
    today: NaiveDate,
    days: i64,
) -> BTreeMap<NaiveDate, usize> {
    let start = today - Duration::days(days.saturating_sub(1).max(0));
    let mut counts = BTreeMap::new();
    for attempt in attempts {
        let day = attempt.taken_at.date_naive();
        if day >= start && day <= today {
            *counts.entry(day).or_insert(0) += 1;
        }
    }
    counts
}

/// Consecutive days with at least one attempt, counted back from `today`.
/// A streak that ended yesterday still counts so it does not reset before the
/// student has had a chance to study today.
pub fn activity_streak(attempts: &[QuizAttempt], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = attempts.iter().map(|a| a.taken_at.date_naive()).collect();
    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}
