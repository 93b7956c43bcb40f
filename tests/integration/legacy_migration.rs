use super::support::generator::scored_quiz;
use super::support::student_fixture::{answers_scoring, StudentFixture};
use anyhow::Result;
use cognitivetwin::models::LoadedProgress;
use cognitivetwin::orchestration::pipeline::ProgressIssue;
use cognitivetwin::orchestration::{EventType, OrchestrationLog};
use cognitivetwin::progress::{ProgressAggregator, ProgressError};
use std::collections::BTreeSet;
use std::fs;

const LEGACY_DOCUMENT: &str = r#"{
  "total_topics": 3,
  "completed_topics": 1,
  "average_score": 61.5,
  "weak_topics": ["Entropy", "Optics"]
}"#;

#[test]
fn legacy_record_is_left_untouched_until_migrated() -> Result<()> {
    let fixture = StudentFixture::new("Lise");
    fixture.generator.queue_quiz(scored_quiz(11, "Laws", "Entropy"));
    fixture.generator.queue_quiz(scored_quiz(15, "Laws", "Entropy"));
    let orchestrator = fixture.orchestrator();
    let progress_path = fixture.layout().progress_path;
    fs::write(&progress_path, LEGACY_DOCUMENT)?;

    let mut session = fixture.start_topic(&orchestrator, "Thermodynamics")?;
    orchestrator.prepare_quiz(&mut session)?;
    let outcome = orchestrator.submit_quiz(&mut session, &answers_scoring(11))?;
    assert!(outcome.progress.is_none());
    assert_eq!(
        outcome.progress_issue,
        Some(ProgressIssue::MigrationRequired {
            legacy_topics: vec!["Entropy".into(), "Optics".into()],
        })
    );
    assert_eq!(fs::read_to_string(&progress_path)?, LEGACY_DOCUMENT);
    assert_eq!(fixture.store().load_attempts()?.len(), 1);

    let log = OrchestrationLog::for_student(&fixture.student);
    assert_eq!(log.events_of_type(EventType::WeakTopicMigrationRequired)?.len(), 1);

    let aggregator = ProgressAggregator::new(&fixture.student);
    assert!(matches!(
        aggregator.recompute(),
        Err(ProgressError::MigrationRequired { .. })
    ));

    let report = aggregator
        .migrate_legacy()?
        .expect("legacy record should migrate");
    assert_eq!(report.discarded_legacy_topics, vec!["Entropy", "Optics"]);
    let entropy: BTreeSet<String> = ["Entropy".to_string()].into_iter().collect();
    assert_eq!(report.record.weak_topics.get("Thermodynamics"), Some(&entropy));
    assert_eq!(report.record.total_topics, 1);
    assert!((report.record.average_score - 55.0).abs() < 1e-9);
    assert!(matches!(fixture.store().load_progress()?, LoadedProgress::Current(_)));
    assert_eq!(log.events_of_type(EventType::WeakTopicsMigrated)?.len(), 1);
    assert!(aggregator.migrate_legacy()?.is_none());

    let mut later = orchestrator.resume_topic(&fixture.student, &session.topic.topic_id)?;
    orchestrator.prepare_quiz(&mut later)?;
    let outcome = orchestrator.submit_quiz(&mut later, &answers_scoring(15))?;
    assert!(outcome.progress_issue.is_none());
    let record = outcome.progress.expect("progress should update after migration");
    assert!(record.weak_topics.is_empty());
    assert_eq!(record.completed_topics, 1);
    Ok(())
}

#[test]
fn grouped_v1_record_upgrades_without_migration() -> Result<()> {
    let fixture = StudentFixture::new("Chien-Shiung");
    fixture.generator.queue_quiz(scored_quiz(10, "Decay", "Parity"));
    let orchestrator = fixture.orchestrator();
    fs::write(
        fixture.layout().progress_path,
        r#"{"total_topics": 1, "completed_topics": 0, "average_score": 30.0,
            "weak_topics": {"Optics": ["Lenses"]}}"#,
    )?;

    let mut session = fixture.start_topic(&orchestrator, "Nuclear Physics")?;
    orchestrator.prepare_quiz(&mut session)?;
    let outcome = orchestrator.submit_quiz(&mut session, &answers_scoring(10))?;
    assert!(outcome.progress_issue.is_none());
    let record = outcome.progress.expect("v1 map documents load as current");
    assert_eq!(record.schema_version, 2);
    assert!(record.weak_topics.contains_key("Optics"));
    assert!(record.weak_topics.contains_key("Nuclear Physics"));
    Ok(())
}
