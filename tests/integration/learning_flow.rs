use super::support::generator::{scored_quiz, true_false_quiz, ScriptedGenerator, FOCUSED_MARKER};
use super::support::student_fixture::{answers_scoring, StudentFixture};
use anyhow::Result;
use cognitivetwin::decision::Action;
use cognitivetwin::grading::GradingError;
use cognitivetwin::models::AnswerSheet;
use cognitivetwin::orchestration::pipeline::SubmissionError;
use cognitivetwin::orchestration::{EventType, OrchestrationLog};
use std::collections::BTreeSet;

#[test]
fn thermodynamics_review_then_advance() -> Result<()> {
    let fixture = StudentFixture::new("Ada");
    fixture.generator.queue_quiz(scored_quiz(11, "Laws", "Entropy"));
    fixture.generator.queue_quiz(scored_quiz(17, "Laws", "Entropy"));
    let orchestrator = fixture.orchestrator();

    let mut session = fixture.start_topic(&orchestrator, "Thermodynamics")?;
    let original_summary = session.topic.summary.clone();
    orchestrator.prepare_quiz(&mut session)?;

    let first = orchestrator.submit_quiz(&mut session, &answers_scoring(11))?;
    assert_eq!(first.grade.score, 55.0);
    let entropy: BTreeSet<String> = ["Entropy".to_string()].into_iter().collect();
    assert_eq!(
        first.action,
        Action::Review {
            topic: "Thermodynamics".into(),
            weak_topics: entropy.clone(),
        }
    );
    let progress = first.progress.expect("progress should update");
    assert_eq!(progress.weak_topics.get("Thermodynamics"), Some(&entropy));

    let bundle = orchestrator.request_focused_review(&mut session)?.clone();
    assert!(bundle.is_complete());
    let focused = bundle.summary.clone().unwrap();
    assert!(focused.contains(FOCUSED_MARKER));
    assert!(focused.contains("Entropy"));
    assert!(!bundle.flashcards.clone().unwrap().is_empty());
    assert!(!bundle.mindmap.clone().unwrap().is_empty());

    orchestrator.start_retake(&mut session)?;
    assert_eq!(session.topic.summary, focused);
    assert_eq!(session.topic.summary_revision, 1);
    let sources = fixture.generator.quiz_sources();
    assert_eq!(sources, vec![original_summary, focused.clone()]);
    let stored = fixture.store().load_topic(&session.topic.topic_id)?.unwrap();
    assert_eq!(stored.summary, focused);

    let second = orchestrator.submit_quiz(&mut session, &answers_scoring(17))?;
    assert_eq!(second.grade.score, 85.0);
    match &second.action {
        Action::Advance { student, message } => {
            assert_eq!(student, "Ada");
            assert!(message.contains("Excellent work, Ada!"));
        }
        other => panic!("expected advance, got {other:?}"),
    }
    let progress = second.progress.expect("progress should update");
    assert!(!progress.weak_topics.contains_key("Thermodynamics"));
    assert_eq!(progress.completed_topics, 1);
    assert!((progress.average_score - 70.0).abs() < 1e-9);
    assert_eq!(session.cycle.rounds(), 1);

    let log = OrchestrationLog::for_student(&fixture.student);
    assert_eq!(log.events_of_type(EventType::QuizGraded)?.len(), 2);
    assert_eq!(log.events_of_type(EventType::ReviewBundleReady)?.len(), 1);
    assert_eq!(log.events_of_type(EventType::TopicSummarySuperseded)?.len(), 1);
    assert_eq!(fixture.store().load_attempts()?.len(), 2);
    Ok(())
}

#[test]
fn incomplete_answers_are_rejected_before_recording() -> Result<()> {
    let fixture = StudentFixture::new("Grace");
    fixture.generator.queue_quiz(true_false_quiz(&["Logic", "Sets", "Proofs"]));
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Discrete Maths")?;
    orchestrator.prepare_quiz(&mut session)?;

    let mut sheet = AnswerSheet::blank(3);
    sheet.set(0, "True");
    sheet.set(2, "False");
    match orchestrator.submit_quiz(&mut session, &sheet) {
        Err(SubmissionError::Grading(GradingError::IncompleteAnswers { missing })) => {
            assert_eq!(missing, vec![2]);
        }
        other => panic!("expected incomplete answers, got {other:?}"),
    }
    assert!(fixture.store().load_attempts()?.is_empty());
    assert!(session.quiz.is_some(), "quiz stays available for completion");

    sheet.set(1, "True");
    let outcome = orchestrator.submit_quiz(&mut session, &sheet)?;
    assert_eq!(outcome.grade.correct_count, 2);
    assert_eq!(outcome.grade.score, 66.7);
    Ok(())
}

#[test]
fn submitting_without_a_quiz_fails() -> Result<()> {
    let fixture = StudentFixture::new("Alan");
    let orchestrator = fixture.orchestrator();
    let mut session = fixture.start_topic(&orchestrator, "Computability")?;
    assert!(matches!(
        orchestrator.submit_quiz(&mut session, &AnswerSheet::blank(0)),
        Err(SubmissionError::NoActiveQuiz)
    ));
    Ok(())
}

#[test]
fn topic_materials_are_best_effort_and_resumable() -> Result<()> {
    let generator = ScriptedGenerator::new().failing_mindmap();
    let fixture = StudentFixture::with_generator("Emmy", generator);
    let orchestrator = fixture.orchestrator();
    let session = fixture.start_topic(&orchestrator, "Thermodynamics")?;
    assert!(session.materials.mindmap.is_none());
    assert!(!session.materials.flashcards.is_empty());
    assert!(session.materials.formula_sheet.is_some());

    let resumed = orchestrator.resume_topic(&fixture.student, &session.topic.topic_id)?;
    assert_eq!(resumed.topic.name, "Thermodynamics");
    assert_eq!(resumed.materials.flashcards, session.materials.flashcards);
    assert_ne!(resumed.session_id, session.session_id);
    Ok(())
}

#[test]
fn topic_without_summary_is_not_created() {
    let generator = ScriptedGenerator::new().failing_summary();
    let fixture = StudentFixture::with_generator("Hedy", generator);
    let orchestrator = fixture.orchestrator();
    assert!(fixture.start_topic(&orchestrator, "Radio").is_err());
    assert!(fixture.store().list_topics().unwrap().is_empty());
}
