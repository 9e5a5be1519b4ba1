//! Completion transitions.
//!
//! Every function takes the current store by reference and returns a
//! [`Transition`] holding the next store; inputs are never mutated. Rewards
//! are explicit in `Transition::awarded`.
//!
//! FlameShards are paid when a section is first completed and when a
//! challenge first passes. Completing a scroll pays nothing more, since a
//! scroll's reward is exactly the sum of those parts.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use flame_catalog::{Course, Scroll};
use flame_grading::Submission;

use crate::config::SectionRetention;
use crate::error::PreconditionNotMet;
use crate::types::{NextScroll, ProgressStore, Transition, TransitionEffect};
use crate::unlock::{first_available, is_unlocked};

/// Make a scroll the active one.
///
/// Unknown and locked scrolls are no-ops. Under
/// [`SectionRetention::ResetOnSwitch`] the section progress of the scroll
/// being left is dropped; under [`SectionRetention::PerScroll`] it is stashed
/// and restored when the learner returns.
pub fn activate_scroll(
    course: &Course,
    progress: &ProgressStore,
    scroll_id: &str,
    retention: SectionRetention,
) -> Transition {
    let Some(scroll) = course.scroll(scroll_id) else {
        return Transition::unchanged(progress, TransitionEffect::UnknownScroll);
    };
    if !is_unlocked(course, scroll, progress) {
        return Transition::unchanged(progress, TransitionEffect::Locked);
    }
    if progress.is_active(scroll_id) {
        return Transition::unchanged(progress, TransitionEffect::AlreadyApplied);
    }

    let mut next = progress.clone();
    if let Some(previous) = next.active_scroll_id.take() {
        let left_behind = std::mem::take(&mut next.completed_section_ids);
        if retention == SectionRetention::PerScroll && !left_behind.is_empty() {
            next.retained_sections.insert(previous, left_behind);
        } else if !left_behind.is_empty() {
            debug!(
                scroll_id = %previous,
                discarded = left_behind.len(),
                "Section progress reset on scroll switch"
            );
        }
    }
    enter_scroll(&mut next, scroll_id);

    Transition::applied(next, 0)
}

/// Mark a section of the active scroll as completed.
///
/// A section of any other scroll is ignored (`InactiveScroll`). Completing
/// the same section twice is ignored (`AlreadyApplied`). A section whose
/// reward was paid before a scroll switch reset is recorded again without
/// paying twice.
pub fn complete_section(
    progress: &ProgressStore,
    scroll_id: &str,
    section_id: &str,
    section_reward: u64,
) -> Transition {
    if !progress.is_active(scroll_id) {
        return Transition::unchanged(progress, TransitionEffect::InactiveScroll);
    }
    if progress.is_section_completed(section_id) {
        return Transition::unchanged(progress, TransitionEffect::AlreadyApplied);
    }

    let mut next = progress.clone();
    next.completed_section_ids.insert(section_id.to_string());

    let first_time = next
        .credited_sections
        .entry(scroll_id.to_string())
        .or_default()
        .insert(section_id.to_string());
    let awarded = if first_time { section_reward } else { 0 };
    next.total_reward = next.total_reward.saturating_add(awarded);

    Transition::applied(next, awarded)
}

/// Whether every section of the scroll is completed in the active scope.
///
/// Section ids are only unique within a scroll, so sections of a scroll that
/// is not active never count.
pub fn sections_complete(progress: &ProgressStore, scroll: &Scroll) -> bool {
    missing_sections(progress, scroll).is_empty()
}

fn missing_sections(progress: &ProgressStore, scroll: &Scroll) -> Vec<String> {
    let active = progress.is_active(&scroll.id);
    scroll
        .section_ids()
        .filter(|id| !active || !progress.is_section_completed(id))
        .map(str::to_string)
        .collect()
}

/// Promote a finished scroll into the completed set.
///
/// Requires every section completed and the challenge passed; otherwise
/// returns [`PreconditionNotMet`] and the caller keeps its current store.
/// Completing an already completed scroll is `AlreadyApplied`; an unknown
/// scroll is `UnknownScroll`.
pub fn complete_scroll(
    course: &Course,
    progress: &ProgressStore,
    scroll_id: &str,
    next_scroll: NextScroll,
) -> Result<Transition, PreconditionNotMet> {
    let Some(scroll) = course.scroll(scroll_id) else {
        return Ok(Transition::unchanged(progress, TransitionEffect::UnknownScroll));
    };
    if progress.is_scroll_completed(scroll_id) {
        return Ok(Transition::unchanged(progress, TransitionEffect::AlreadyApplied));
    }

    let missing = missing_sections(progress, scroll);
    let challenge_passed = progress.is_challenge_passed(scroll_id, &scroll.challenge.id);
    if !missing.is_empty() || !challenge_passed {
        return Err(PreconditionNotMet {
            scroll_id: scroll_id.to_string(),
            missing_sections: missing,
            challenge_passed,
        });
    }

    let mut next = progress.clone();
    next.completed_scroll_ids.insert(scroll_id.to_string());
    next.completed_section_ids = BTreeSet::new();
    next.retained_sections.remove(scroll_id);
    next.active_scroll_id = None;

    let target = match next_scroll {
        NextScroll::Clear => None,
        NextScroll::FirstAvailable => first_available(course, &next).map(|s| s.id.clone()),
        NextScroll::Activate(id) => match course.scroll(&id) {
            Some(s) if is_unlocked(course, s, &next) => Some(id),
            _ => {
                warn!(scroll_id = %id, "Requested next scroll is not available");
                None
            }
        },
    };
    if let Some(target) = target {
        enter_scroll(&mut next, &target);
    }

    Ok(Transition::applied(next, 0))
}

/// Fold a passed submission's reward into the store.
///
/// Pending and failed submissions are `NotPassed`. A submission for a
/// challenge the scroll does not carry is `ChallengeMismatch` and changes
/// nothing. Each submission counts at most once, and so does each challenge:
/// a second passing submission for an already passed challenge pays nothing.
pub fn credit_submission(course: &Course, progress: &ProgressStore, submission: &Submission) -> Transition {
    if !submission.is_passed() {
        return Transition::unchanged(progress, TransitionEffect::NotPassed);
    }
    let Some(scroll) = course.scroll(&submission.scroll_id) else {
        return Transition::unchanged(progress, TransitionEffect::UnknownScroll);
    };
    if submission.challenge_id != scroll.challenge.id {
        warn!(
            submission_id = %submission.id,
            scroll_id = %scroll.id,
            challenge_id = %submission.challenge_id,
            expected = %scroll.challenge.id,
            "Passed submission is for another challenge; not credited"
        );
        return Transition::unchanged(progress, TransitionEffect::ChallengeMismatch);
    }
    if progress.credited_submissions.contains(&submission.id)
        || progress.is_challenge_passed(&scroll.id, &scroll.challenge.id)
    {
        return Transition::unchanged(progress, TransitionEffect::AlreadyApplied);
    }

    let mut next = progress.clone();
    next.credited_submissions.insert(submission.id.clone());
    // replaces any entry left by an earlier challenge id
    next.passed_challenges
        .insert(scroll.id.clone(), scroll.challenge.id.clone());
    next.total_reward = next.total_reward.saturating_add(submission.flame_shards_awarded);

    Transition::applied(next, submission.flame_shards_awarded)
}

fn enter_scroll(store: &mut ProgressStore, scroll_id: &str) {
    store.completed_section_ids = store.retained_sections.remove(scroll_id).unwrap_or_default();
    store.active_scroll_id = Some(scroll_id.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use flame_catalog::{Challenge, Section};
    use flame_grading::{GradeOutcome, SubmissionLog};

    fn course() -> Course {
        Course::new("forging-flame", "Forging the Flame")
            .with_scroll(
                Scroll::new("s1", "Kindling", Challenge::new("c1", 25))
                    .with_section(Section::new("a", 10))
                    .with_section(Section::new("b", 15)),
            )
            .with_scroll(
                Scroll::new("s2", "Tending", Challenge::new("c2", 30))
                    .with_section(Section::new("a", 20))
                    .with_prerequisite("s1"),
            )
            .with_scroll(
                Scroll::new("s3", "Sharing", Challenge::new("c3", 5))
                    .with_section(Section::new("x", 5)),
            )
    }

    fn start() -> ProgressStore {
        ProgressStore::new("ana", "forging-flame")
    }

    fn passed(scroll_id: &str, challenge_id: &str, reward: u64) -> Submission {
        let mut log = SubmissionLog::new();
        let id = log.submit(scroll_id, challenge_id, "ana", serde_json::Value::Null).id;
        log.resolve(&id, GradeOutcome::Passed, reward).unwrap()
    }

    fn active_on(scroll_id: &str) -> ProgressStore {
        activate_scroll(&course(), &start(), scroll_id, SectionRetention::ResetOnSwitch).store
    }

    #[test]
    fn test_activate_scroll() {
        let course = course();
        let t = activate_scroll(&course, &start(), "s1", SectionRetention::ResetOnSwitch);
        assert!(t.is_applied());
        assert_eq!(t.store.active_scroll_id.as_deref(), Some("s1"));
        assert_eq!(t.store.version, 1);

        let again = activate_scroll(&course, &t.store, "s1", SectionRetention::ResetOnSwitch);
        assert_eq!(again.effect, TransitionEffect::AlreadyApplied);
        assert_eq!(again.store, t.store);

        let locked = activate_scroll(&course, &t.store, "s2", SectionRetention::ResetOnSwitch);
        assert_eq!(locked.effect, TransitionEffect::Locked);
        assert_eq!(locked.store, t.store);

        let unknown = activate_scroll(&course, &t.store, "nope", SectionRetention::ResetOnSwitch);
        assert_eq!(unknown.effect, TransitionEffect::UnknownScroll);
    }

    #[test]
    fn test_complete_section_awards_once() {
        let store = active_on("s1");
        let first = complete_section(&store, "s1", "a", 10);
        assert_eq!(first.awarded, 10);
        assert_eq!(first.store.total_reward, 10);

        let second = complete_section(&first.store, "s1", "a", 10);
        assert_eq!(second.effect, TransitionEffect::AlreadyApplied);
        assert_eq!(second.awarded, 0);
        assert_eq!(second.store, first.store);

        // the input is left untouched
        assert!(store.completed_section_ids.is_empty());
        assert_eq!(store.total_reward, 0);
    }

    #[test]
    fn test_complete_section_on_inactive_scroll_is_noop() {
        let store = active_on("s1");
        let t = complete_section(&store, "s3", "x", 5);
        assert_eq!(t.effect, TransitionEffect::InactiveScroll);
        assert_eq!(t.awarded, 0);
        assert_eq!(t.store, store);

        let nothing_active = complete_section(&start(), "s1", "a", 10);
        assert_eq!(nothing_active.effect, TransitionEffect::InactiveScroll);
    }

    #[test]
    fn test_reset_on_switch_discards_sections_but_never_repays() {
        let course = course();
        let store = complete_section(&active_on("s1"), "s1", "a", 10).store;

        let switched = activate_scroll(&course, &store, "s3", SectionRetention::ResetOnSwitch).store;
        assert!(switched.completed_section_ids.is_empty());
        assert_eq!(switched.total_reward, 10);

        let back = activate_scroll(&course, &switched, "s1", SectionRetention::ResetOnSwitch).store;
        assert!(back.completed_section_ids.is_empty());

        let redo = complete_section(&back, "s1", "a", 10);
        assert!(redo.is_applied());
        assert_eq!(redo.awarded, 0);
        assert_eq!(redo.store.total_reward, 10);
        assert!(redo.store.is_section_completed("a"));
    }

    #[test]
    fn test_per_scroll_retention_restores_sections() {
        let course = course();
        let store = complete_section(&active_on("s1"), "s1", "a", 10).store;

        let switched = activate_scroll(&course, &store, "s3", SectionRetention::PerScroll).store;
        assert!(switched.completed_section_ids.is_empty());
        assert!(switched.retained_sections.contains_key("s1"));

        let back = activate_scroll(&course, &switched, "s1", SectionRetention::PerScroll).store;
        assert!(back.is_section_completed("a"));
        assert!(back.retained_sections.is_empty());
    }

    #[test]
    fn test_complete_scroll_requires_sections_and_challenge() {
        let course = course();
        let store = complete_section(&active_on("s1"), "s1", "a", 10).store;

        let err = complete_scroll(&course, &store, "s1", NextScroll::Clear).unwrap_err();
        assert_eq!(err.missing_sections, vec!["b".to_string()]);
        assert!(!err.challenge_passed);

        let store = complete_section(&store, "s1", "b", 15).store;
        let err = complete_scroll(&course, &store, "s1", NextScroll::Clear).unwrap_err();
        assert!(err.missing_sections.is_empty());
        assert!(!err.challenge_passed);

        let store = credit_submission(&course, &store, &passed("s1", "c1", 25)).store;
        assert_eq!(store.total_reward, 50);

        let done = complete_scroll(&course, &store, "s1", NextScroll::Clear).unwrap();
        assert!(done.is_applied());
        assert_eq!(done.awarded, 0);
        assert_eq!(done.store.total_reward, 50);
        assert!(done.store.is_scroll_completed("s1"));
        assert!(done.store.completed_section_ids.is_empty());
        assert_eq!(done.store.active_scroll_id, None);

        let again = complete_scroll(&course, &done.store, "s1", NextScroll::Clear).unwrap();
        assert_eq!(again.effect, TransitionEffect::AlreadyApplied);
        assert_eq!(again.store, done.store);
    }

    #[test]
    fn test_sections_of_other_scroll_do_not_count() {
        // s1 and s2 both have a section "a"
        let course = course();
        let store = complete_section(&active_on("s1"), "s1", "a", 10).store;
        let mut store = credit_submission(&course, &store, &passed("s2", "c2", 30)).store;
        store.completed_scroll_ids.insert("s1".to_string());

        let err = complete_scroll(&course, &store, "s2", NextScroll::Clear).unwrap_err();
        assert_eq!(err.missing_sections, vec!["a".to_string()]);
        assert!(err.challenge_passed);
        assert!(!sections_complete(&store, course.scroll("s2").unwrap()));
    }

    #[test]
    fn test_next_scroll_selection() {
        let course = course();
        let mut store = active_on("s1");
        for (id, reward) in [("a", 10), ("b", 15)] {
            store = complete_section(&store, "s1", id, reward).store;
        }
        let store = credit_submission(&course, &store, &passed("s1", "c1", 25)).store;

        let first = complete_scroll(&course, &store, "s1", NextScroll::FirstAvailable).unwrap();
        assert_eq!(first.store.active_scroll_id.as_deref(), Some("s2"));

        let chosen = complete_scroll(&course, &store, "s1", NextScroll::Activate("s3".into())).unwrap();
        assert_eq!(chosen.store.active_scroll_id.as_deref(), Some("s3"));

        let bogus = complete_scroll(&course, &store, "s1", NextScroll::Activate("zz".into())).unwrap();
        assert_eq!(bogus.store.active_scroll_id, None);
    }

    #[test]
    fn test_credit_submission_rules() {
        let course = course();
        let store = start();

        let mut log = SubmissionLog::new();
        let pending = log.submit("s1", "c1", "ana", serde_json::Value::Null);
        assert_eq!(credit_submission(&course, &store, &pending).effect, TransitionEffect::NotPassed);

        let failed = log.resolve(&pending.id, GradeOutcome::Failed, 25).unwrap();
        assert_eq!(credit_submission(&course, &store, &failed).effect, TransitionEffect::NotPassed);

        let pass = passed("s1", "c1", 25);
        let credited = credit_submission(&course, &store, &pass);
        assert_eq!(credited.awarded, 25);
        assert!(credited.store.is_challenge_passed("s1", "c1"));

        let twice = credit_submission(&course, &credited.store, &pass);
        assert_eq!(twice.effect, TransitionEffect::AlreadyApplied);
        assert_eq!(twice.store.total_reward, 25);

        let second_pass = passed("s1", "c1", 25);
        let repeat = credit_submission(&course, &credited.store, &second_pass);
        assert_eq!(repeat.awarded, 0);
        assert_eq!(repeat.store.total_reward, 25);
    }

    #[test]
    fn test_credit_ignores_other_challenge_ids() {
        let course = course();
        let store = complete_section(&active_on("s1"), "s1", "a", 10).store;
        let mut store = complete_section(&store, "s1", "b", 15).store;

        let stale = credit_submission(&course, &store, &passed("s1", "c1-old", 25));
        assert_eq!(stale.effect, TransitionEffect::ChallengeMismatch);
        assert_eq!(stale.store, store);

        let unknown = credit_submission(&course, &store, &passed("zz", "c1", 25));
        assert_eq!(unknown.effect, TransitionEffect::UnknownScroll);

        // an entry recorded under an old challenge id does not block the real one
        store.passed_challenges.insert("s1".to_string(), "c1-old".to_string());
        let real = credit_submission(&course, &store, &passed("s1", "c1", 25));
        assert!(real.is_applied());
        assert_eq!(real.awarded, 25);
        assert!(real.store.is_challenge_passed("s1", "c1"));

        let done = complete_scroll(&course, &real.store, "s1", NextScroll::Clear).unwrap();
        assert!(done.store.is_scroll_completed("s1"));
    }

    #[test]
    fn test_reward_total_saturates() {
        let course = course();
        let mut store = active_on("s1");
        store.total_reward = u64::MAX - 5;

        let section = complete_section(&store, "s1", "a", 10);
        assert_eq!(section.store.total_reward, u64::MAX);

        let pass = credit_submission(&course, &section.store, &passed("s1", "c1", 25));
        assert_eq!(pass.awarded, 25);
        assert_eq!(pass.store.total_reward, u64::MAX);
    }

    enum Step {
        Activate(&'static str),
        Section(&'static str, &'static str, u64),
        Pass(&'static str, &'static str, u64),
        Complete(&'static str, NextScroll),
    }

    #[test]
    fn test_reward_and_completion_are_monotonic() {
        let course = course();
        let steps = vec![
            Step::Activate("s3"),
            Step::Section("s3", "x", 5),
            Step::Activate("s1"),
            Step::Section("s1", "a", 10),
            Step::Section("s1", "a", 10),
            Step::Activate("s3"),
            Step::Section("s3", "x", 5),
            Step::Pass("s3", "c3", 5),
            Step::Complete("s3", NextScroll::Activate("s1".into())),
            Step::Section("s1", "a", 10),
            Step::Section("s1", "b", 15),
        ];

        let mut store = start();
        for step in steps {
            let next = match step {
                Step::Activate(id) => {
                    activate_scroll(&course, &store, id, SectionRetention::ResetOnSwitch).store
                }
                Step::Section(scroll, section, reward) => {
                    complete_section(&store, scroll, section, reward).store
                }
                Step::Pass(scroll, challenge, reward) => {
                    credit_submission(&course, &store, &passed(scroll, challenge, reward)).store
                }
                Step::Complete(scroll, next) => complete_scroll(&course, &store, scroll, next)
                    .map(|t| t.store)
                    .unwrap_or_else(|_| store.clone()),
            };
            assert!(next.total_reward >= store.total_reward);
            assert!(next.completed_scroll_ids.is_superset(&store.completed_scroll_ids));
            assert!(next.version >= store.version);
            store = next;
        }

        assert!(store.is_scroll_completed("s3"));
        assert_eq!(store.active_scroll_id.as_deref(), Some("s1"));
        assert_eq!(store.total_reward, 5 + 5 + 10 + 15);
    }
}
