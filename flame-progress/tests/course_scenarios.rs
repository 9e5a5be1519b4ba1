//! End-to-end course scenarios and progress properties

use std::collections::BTreeSet;
use std::sync::Arc;

use flame_catalog::{audit_course, Challenge, Course, InMemoryContentSource, Scroll, Section};
use flame_grading::{
    GradeOutcome, GradeReport, ScriptedGrader, SubmissionError, SubmissionLog, SubmissionStatus,
};
use flame_progress::transition::{activate_scroll, complete_scroll, complete_section, credit_submission};
use flame_progress::{
    resolve_unlocked, EngineConfig, InMemoryProgressRepository, NextScroll, ProgressEngine,
    ProgressError, ProgressRepository, ProgressStore, SectionRetention, TransitionEffect,
};

const DEMO_COURSE: &str = include_str!("../content/forging-flame.yaml");

/// S1: sections worth 10 and 15, challenge worth 25. S2 requires S1.
fn two_scroll_course() -> Course {
    Course::new("forging-flame", "Forging the Flame")
        .with_scroll(
            Scroll::new("S1", "Kindling", Challenge::new("S1-challenge", 25))
                .with_section(Section::new("S1-a", 10))
                .with_section(Section::new("S1-b", 15)),
        )
        .with_scroll(
            Scroll::new("S2", "Tending", Challenge::new("S2-challenge", 30))
                .with_section(Section::new("S2-a", 20))
                .with_prerequisite("S1"),
        )
}

fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn fresh() -> ProgressStore {
    ProgressStore::new("ana", "forging-flame")
}

#[test]
fn test_scenario_a_complete_first_scroll() {
    let course = two_scroll_course();
    let mut log = SubmissionLog::new();
    let progress = fresh();
    assert_eq!(resolve_unlocked(&course, &progress), ids(&["S1"]));

    let progress = activate_scroll(&course, &progress, "S1", SectionRetention::ResetOnSwitch).store;
    let progress = complete_section(&progress, "S1", "S1-a", 10).store;
    let progress = complete_section(&progress, "S1", "S1-b", 15).store;
    assert_eq!(progress.total_reward, 25);

    let submission = log.submit("S1", "S1-challenge", "ana", serde_json::json!("spark"));
    let passed = log.resolve(&submission.id, GradeOutcome::Passed, 25).unwrap();
    let progress = credit_submission(&course, &progress, &passed).store;
    assert_eq!(progress.total_reward, 50);

    let done = complete_scroll(&course, &progress, "S1", NextScroll::Clear).unwrap();
    assert!(done.is_applied());
    assert_eq!(done.store.completed_scroll_ids, ids(&["S1"]));
    assert_eq!(done.store.total_reward, 50);
    assert_eq!(resolve_unlocked(&course, &done.store), ids(&["S1", "S2"]));
}

#[test]
fn test_scenario_b_premature_completion() {
    let course = two_scroll_course();
    let mut progress = fresh();
    progress.completed_scroll_ids.insert("S1".into());
    let progress = activate_scroll(&course, &progress, "S2", SectionRetention::ResetOnSwitch).store;

    let err = complete_scroll(&course, &progress, "S2", NextScroll::Clear).unwrap_err();
    assert_eq!(err.scroll_id, "S2");
    assert_eq!(err.missing_sections, vec!["S2-a".to_string()]);
    assert!(!err.challenge_passed);
    // the caller keeps its store; nothing was consumed
    assert!(!progress.is_scroll_completed("S2"));
    assert_eq!(progress.active_scroll_id.as_deref(), Some("S2"));
}

#[test]
fn test_scenario_c_section_of_inactive_scroll() {
    let course = two_scroll_course();
    let mut progress = fresh();
    progress.completed_scroll_ids.insert("S1".into());
    let progress = activate_scroll(&course, &progress, "S1", SectionRetention::ResetOnSwitch).store;

    let t = complete_section(&progress, "S2", "S2-a", 20);
    assert_eq!(t.awarded, 0);
    assert_eq!(t.effect, TransitionEffect::InactiveScroll);
    assert_eq!(t.store, progress);
}

#[test]
fn test_scenario_d_submission_lifecycle() {
    let mut log = SubmissionLog::new();
    let submission = log.submit("S1", "S1-challenge", "ana", serde_json::Value::Null);
    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.flame_shards_awarded, 0);

    let passed = log.resolve(&submission.id, GradeOutcome::Passed, 25).unwrap();
    assert_eq!(passed.status, SubmissionStatus::Passed);
    assert_eq!(passed.flame_shards_awarded, 25);

    let err = log.resolve(&submission.id, GradeOutcome::Passed, 25).unwrap_err();
    assert!(matches!(err, SubmissionError::InvalidTransition { .. }));
}

#[test]
fn test_section_completion_is_idempotent_everywhere() {
    let course = two_scroll_course();
    let mut starts = vec![fresh()];
    let active = activate_scroll(&course, &fresh(), "S1", SectionRetention::ResetOnSwitch).store;
    starts.push(active.clone());
    starts.push(complete_section(&active, "S1", "S1-a", 10).store);

    for start in &starts {
        for scroll in &course.scrolls {
            for section in &scroll.sections {
                let once = complete_section(start, &scroll.id, &section.id, section.reward).store;
                let twice = complete_section(&once, &scroll.id, &section.id, section.reward).store;
                assert_eq!(once.total_reward, twice.total_reward);
                assert_eq!(once, twice);
            }
        }
    }
}

#[test]
fn test_no_premature_completion_for_any_partial_state() {
    let course = two_scroll_course();
    let scroll = course.scroll("S1").unwrap();
    let active = activate_scroll(&course, &fresh(), "S1", SectionRetention::ResetOnSwitch).store;

    let mut log = SubmissionLog::new();
    let submission = log.submit("S1", "S1-challenge", "ana", serde_json::Value::Null);
    let passed = log.resolve(&submission.id, GradeOutcome::Passed, 25).unwrap();

    // every subset of sections, with and without the challenge
    for mask in 0u32..4 {
        for with_challenge in [false, true] {
            let mut progress = active.clone();
            for (i, section) in scroll.sections.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    progress = complete_section(&progress, "S1", &section.id, section.reward).store;
                }
            }
            if with_challenge {
                progress = credit_submission(&course, &progress, &passed).store;
            }

            let result = complete_scroll(&course, &progress, "S1", NextScroll::Clear);
            let ready = mask == 3 && with_challenge;
            assert_eq!(result.is_ok(), ready, "mask {mask} challenge {with_challenge}");
        }
    }
}

#[test]
fn test_failed_submission_never_counts() {
    let course = two_scroll_course();
    let mut progress = activate_scroll(&course, &fresh(), "S1", SectionRetention::ResetOnSwitch).store;
    for (id, reward) in [("S1-a", 10), ("S1-b", 15)] {
        progress = complete_section(&progress, "S1", id, reward).store;
    }

    let mut log = SubmissionLog::new();
    let submission = log.submit("S1", "S1-challenge", "ana", serde_json::Value::Null);
    let failed = log.resolve(&submission.id, GradeOutcome::Failed, 25).unwrap();
    assert_eq!(failed.flame_shards_awarded, 0);

    let progress = credit_submission(&course, &progress, &failed).store;
    let err = complete_scroll(&course, &progress, "S1", NextScroll::Clear).unwrap_err();
    assert!(err.missing_sections.is_empty());
    assert!(!err.challenge_passed);
}

#[test]
fn test_demo_course_is_consistent() {
    let course = Course::from_yaml(DEMO_COURSE).unwrap();
    assert!(audit_course(&course).is_empty());
    assert_eq!(course.total_reward, course.computed_reward());
    assert_eq!(resolve_unlocked(&course, &ProgressStore::new("u", &course.id)), ids(&["kindling"]));
}

#[tokio::test]
async fn test_session_walks_whole_course() {
    let content = Arc::new(InMemoryContentSource::new());
    let course_id = content.load_yaml(DEMO_COURSE).await.unwrap();
    let grader = Arc::new(ScriptedGrader::new("strict").then(GradeReport::failed("Not yet")));
    let engine = ProgressEngine::new(content, Arc::new(InMemoryProgressRepository::new()), grader.clone());

    let session = engine.open_session("ana", &course_id).await.unwrap();
    let course = Arc::clone(session.course());

    let order = ["kindling", "warding", "tending", "sharing"];
    for scroll_id in order {
        let t = session.activate_scroll(scroll_id).await.unwrap();
        assert!(t.is_applied() || t.effect == TransitionEffect::AlreadyApplied);

        let scroll = course.scroll(scroll_id).unwrap();
        for section in &scroll.sections {
            session.complete_section(scroll_id, &section.id).await.unwrap();
        }

        loop {
            let pending = session.submit_challenge(scroll_id, serde_json::Value::Null).await.unwrap();
            if pending.handle.await.unwrap().unwrap().is_passed() {
                break;
            }
        }
        session.complete_scroll(scroll_id, NextScroll::Clear).await.unwrap();
    }

    let snapshot = session.snapshot().await;
    assert!(snapshot.is_finished());
    assert_eq!(snapshot.percent_complete, 100.0);
    assert_eq!(snapshot.flame_shards_earned, course.total_reward);
    assert_eq!(snapshot.flame_shards_available, 235);
    assert_eq!(grader.call_count(), 5);

    let stats = session.submissions().await.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.passed, 4);
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let content = Arc::new(InMemoryContentSource::with_courses([two_scroll_course()]));
    let engine = ProgressEngine::new(
        content,
        Arc::new(InMemoryProgressRepository::new()),
        Arc::new(ScriptedGrader::default()),
    );
    let session = engine.open_session("ana", "forging-flame").await.unwrap();
    session.activate_scroll("S1").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            session.complete_section("S1", "S1-a").await.unwrap().awarded
        }));
    }

    let mut awarded = 0;
    for handle in handles {
        awarded += handle.await.unwrap();
    }
    assert_eq!(awarded, 10);
    assert_eq!(session.progress().await.total_reward, 10);
}

#[tokio::test]
async fn test_progress_survives_engine_restart() {
    let repo = Arc::new(InMemoryProgressRepository::new());
    let content = Arc::new(InMemoryContentSource::with_courses([two_scroll_course()]));

    {
        let engine = ProgressEngine::new(content.clone(), repo.clone(), Arc::new(ScriptedGrader::default()));
        let session = engine.open_session("ana", "forging-flame").await.unwrap();
        session.activate_scroll("S1").await.unwrap();
        session.complete_section("S1", "S1-a").await.unwrap();
        session.complete_section("S1", "S1-b").await.unwrap();
        session
            .submit_challenge("S1", serde_json::Value::Null)
            .await
            .unwrap()
            .handle
            .await
            .unwrap();
        session.complete_scroll("S1", NextScroll::FirstAvailable).await.unwrap();
    }

    let stored = repo.load("ana", "forging-flame").await.unwrap().unwrap();
    assert_eq!(stored.total_reward, 50);

    let engine = ProgressEngine::new(content, repo.clone(), Arc::new(ScriptedGrader::default()));
    let session = engine.open_session("ana", "forging-flame").await.unwrap();
    let progress = session.progress().await;
    assert_eq!(progress.completed_scroll_ids, ids(&["S1"]));
    assert_eq!(progress.active_scroll_id.as_deref(), Some("S2"));
    assert_eq!(session.unlocked().await, ids(&["S1", "S2"]));
    assert_eq!(session.submissions().await.len(), 1);
}

#[tokio::test]
async fn test_per_scroll_retention_through_engine() {
    let mut config = EngineConfig::default();
    config.progress.section_retention = SectionRetention::PerScroll;
    let course = two_scroll_course().with_scroll(
        Scroll::new("S3", "Warding", Challenge::new("S3-challenge", 5)).with_section(Section::new("S3-a", 5)),
    );

    let engine = ProgressEngine::new(
        Arc::new(InMemoryContentSource::with_courses([course])),
        Arc::new(InMemoryProgressRepository::new()),
        Arc::new(ScriptedGrader::default()),
    )
    .with_config(config);

    let session = engine.open_session("ana", "forging-flame").await.unwrap();
    session.activate_scroll("S1").await.unwrap();
    session.complete_section("S1", "S1-a").await.unwrap();
    session.activate_scroll("S3").await.unwrap();
    session.activate_scroll("S1").await.unwrap();

    let progress = session.progress().await;
    assert!(progress.is_section_completed("S1-a"));
    assert_eq!(progress.total_reward, 10);
}

#[tokio::test]
async fn test_locked_submission_is_an_error() {
    let engine = ProgressEngine::new(
        Arc::new(InMemoryContentSource::with_courses([two_scroll_course()])),
        Arc::new(InMemoryProgressRepository::new()),
        Arc::new(ScriptedGrader::default()),
    );
    let session = engine.open_session("ana", "forging-flame").await.unwrap();
    let err = session.submit_challenge("S2", serde_json::Value::Null).await.err().unwrap();
    assert!(matches!(err, ProgressError::ScrollLocked(id) if id == "S2"));
}

#[tokio::test]
async fn test_fixed_delay_grader_from_config() {
    let mut config = EngineConfig::default();
    config.grading.fixed_delay_ms = 10;

    let engine = ProgressEngine::from_config(
        config,
        Arc::new(InMemoryContentSource::with_courses([two_scroll_course()])),
        Arc::new(InMemoryProgressRepository::new()),
    );
    let session = engine.open_session("ana", "forging-flame").await.unwrap();
    let pending = session.submit_challenge("S1", serde_json::json!("offering")).await.unwrap();
    assert!(pending.submission.is_pending());

    let graded = pending.handle.await.unwrap().unwrap();
    assert!(graded.is_passed());
    assert_eq!(graded.flame_shards_awarded, 25);
    assert!(graded.feedback.is_some());
}
