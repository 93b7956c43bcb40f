use super::support::generator::{scored_quiz, true_false_quiz};
use super::support::student_fixture::{answers_scoring, StudentFixture};
use anyhow::Result;
use chrono::Utc;
use cognitivetwin::decision::{Action, Verdict};
use cognitivetwin::models::AnswerSheet;
use cognitivetwin::orchestration::pipeline::ProgressIssue;
use cognitivetwin::orchestration::{EventType, OrchestrationLog};
use cognitivetwin::progress::{activity_streak, topic_mastery, ProgressAggregator, ProgressWarning};
use std::collections::BTreeSet;
use std::fs;

fn subtopics(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn networking_weak_topics_clear_once_mastered() -> Result<()> {
    let fixture = StudentFixture::new("Radia");
    fixture.generator.queue_quiz(scored_quiz(13, "Routing", "Subnetting"));
    fixture.generator.queue_quiz(scored_quiz(16, "Routing", "Subnetting"));
    let orchestrator = fixture.orchestrator();

    let mut session = fixture.start_topic(&orchestrator, "Networking")?;
    orchestrator.prepare_quiz(&mut session)?;
    let first = orchestrator.submit_quiz(&mut session, &answers_scoring(13))?;
    assert_eq!(first.grade.score, 65.0);
    assert!(first.progress_issue.is_none());
    let record = fixture.progress();
    assert_eq!(record.weak_topics.get("Networking"), Some(&subtopics(&["Subnetting"])));
    assert_eq!(record.total_topics, 1);
    assert_eq!(record.completed_topics, 0);
    assert!((record.average_score - 65.0).abs() < 1e-9);

    // A later session on the same topic starts a fresh remediation cycle.
    let mut later = orchestrator.resume_topic(&fixture.student, &session.topic.topic_id)?;
    orchestrator.prepare_quiz(&mut later)?;
    let second = orchestrator.submit_quiz(&mut later, &answers_scoring(16))?;
    assert_eq!(second.grade.score, 80.0);
    assert_eq!(second.action.verdict(), Verdict::Advance);

    let record = fixture.progress();
    assert!(record.weak_topics.is_empty());
    assert_eq!(record.completed_topics, 1);
    assert!((record.average_score - 72.5).abs() < 1e-9);
    assert_eq!(fixture.store().load_attempts()?.len(), 2);
    let scores: Vec<f64> = fixture
        .store()
        .attempts_for_topic(&session.topic.topic_id)?
        .iter()
        .map(|a| a.score)
        .collect();
    assert_eq!(scores, vec![65.0, 80.0]);
    Ok(())
}

#[test]
fn failed_progress_write_keeps_attempt_and_recompute_heals() -> Result<()> {
    let fixture = StudentFixture::new("Barbara");
    fixture.generator.queue_quiz(scored_quiz(8, "Stacks", "Heaps"));
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Data Structures")?;
    orchestrator.prepare_quiz(&mut session)?;

    // A directory where the record should be makes every load and save fail.
    let progress_path = fixture.layout().progress_path;
    fs::remove_file(&progress_path)?;
    fs::create_dir_all(&progress_path)?;
    let outcome = orchestrator.submit_quiz(&mut session, &answers_scoring(8))?;
    assert!(outcome.progress.is_none());
    assert!(matches!(outcome.progress_issue, Some(ProgressIssue::Stale { .. })));
    assert!(matches!(outcome.action, Action::Review { .. }));
    assert_eq!(fixture.store().load_attempts()?.len(), 1);

    let log = OrchestrationLog::for_student(&fixture.student);
    assert_eq!(log.events_of_type(EventType::ProgressStale)?.len(), 1);

    fs::remove_dir_all(&progress_path)?;
    let healed = ProgressAggregator::new(&fixture.student).recompute()?;
    assert_eq!(healed.total_topics, 1);
    assert!((healed.average_score - 40.0).abs() < 1e-9);
    assert_eq!(healed.weak_topics.get("Data Structures"), Some(&subtopics(&["Heaps"])));
    assert_eq!(fixture.progress(), healed);
    assert_eq!(log.events_of_type(EventType::ProgressRecomputed)?.len(), 1);
    Ok(())
}

#[test]
fn deleted_topic_warns_but_totals_still_update() -> Result<()> {
    let fixture = StudentFixture::new("Frances");
    fixture.generator.queue_quiz(true_false_quiz(&["Lexing", "Parsing"]));
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Compilers")?;
    orchestrator.prepare_quiz(&mut session)?;
    assert!(fixture.store().delete_topic(&session.topic.topic_id)?);

    let mut sheet = AnswerSheet::blank(2);
    sheet.set(0, "True");
    sheet.set(1, "False");
    let outcome = orchestrator.submit_quiz(&mut session, &sheet)?;
    assert_eq!(
        outcome.warnings,
        vec![ProgressWarning::TopicNameMissing {
            topic_id: session.topic.topic_id
        }]
    );
    let record = outcome.progress.expect("totals should still be saved");
    assert_eq!(record.total_topics, 0);
    assert!((record.average_score - 50.0).abs() < 1e-9);
    assert!(record.weak_topics.is_empty());
    Ok(())
}

#[test]
fn recompute_is_idempotent() -> Result<()> {
    let fixture = StudentFixture::new("Katherine");
    fixture.generator.queue_quiz(scored_quiz(12, "Orbits", "Thrust"));
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Rocketry")?;
    orchestrator.prepare_quiz(&mut session)?;
    orchestrator.submit_quiz(&mut session, &answers_scoring(12))?;

    let aggregator = ProgressAggregator::new(&fixture.student);
    let first = aggregator.recompute()?;
    let second = aggregator.recompute()?;
    assert_eq!(first.total_topics, second.total_topics);
    assert_eq!(first.completed_topics, second.completed_topics);
    assert_eq!(first.average_score, second.average_score);
    assert_eq!(first.weak_topics, second.weak_topics);
    assert_eq!(second.weak_topics.get("Rocketry"), Some(&subtopics(&["Thrust"])));
    Ok(())
}

#[test]
fn dashboard_insights_reflect_attempts() -> Result<()> {
    let fixture = StudentFixture::new("Margaret");
    fixture.generator.queue_quiz(scored_quiz(18, "Guidance", "Abort"));
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Apollo")?;
    fixture.start_topic(&orchestrator, "Gemini")?;
    orchestrator.prepare_quiz(&mut session)?;
    orchestrator.submit_quiz(&mut session, &answers_scoring(18))?;

    let store = fixture.store();
    let topics = store.list_topics()?;
    let attempts = store.load_attempts()?;
    let mastery = topic_mastery(&topics, &attempts);
    assert_eq!(mastery.len(), 2);
    let apollo = mastery
        .iter()
        .find(|m| m.topic_name == "Apollo")
        .expect("apollo mastery");
    assert_eq!(apollo.best_score, 90.0);
    assert_eq!(apollo.attempts, 1);
    assert_eq!(apollo.verdict, Some(Verdict::Advance));
    let gemini = mastery
        .iter()
        .find(|m| m.topic_name == "Gemini")
        .expect("gemini mastery");
    assert_eq!(gemini.attempts, 0);
    assert_eq!(gemini.verdict, None);

    assert_eq!(activity_streak(&attempts, Utc::now().date_naive()), 1);
    Ok(())
}
