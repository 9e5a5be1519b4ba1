//! Unlock resolution.
//!
//! A scroll is unlocked iff every prerequisite is in the completed set.
//! Display order plays no part. Prerequisites that name a scroll outside the
//! course can never be met; they are reported, not raised.

use std::collections::BTreeSet;
use tracing::warn;

use flame_catalog::{missing_prerequisites, CatalogDiagnostic, Course, Scroll, ScrollId};

use crate::types::{ProgressStore, ScrollState, ScrollStatus};

/// Unlocked scrolls together with the content problems found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockReport {
    pub unlocked: BTreeSet<ScrollId>,
    /// `UnsatisfiableDependency` diagnostics
    pub diagnostics: Vec<CatalogDiagnostic>,
}

/// Whether a scroll of the course is unlocked.
pub fn is_unlocked(course: &Course, scroll: &Scroll, progress: &ProgressStore) -> bool {
    scroll
        .prerequisites
        .iter()
        .all(|p| course.contains(p) && progress.is_scroll_completed(p))
}

/// Ids of every unlocked scroll.
///
/// Total and side-effect free apart from `warn`-level logging of
/// unsatisfiable prerequisites.
pub fn resolve_unlocked(course: &Course, progress: &ProgressStore) -> BTreeSet<ScrollId> {
    resolve_with_diagnostics(course, progress).unlocked
}

/// Like [`resolve_unlocked`], also returning the diagnostics.
pub fn resolve_with_diagnostics(course: &Course, progress: &ProgressStore) -> UnlockReport {
    let mut report = UnlockReport::default();

    for scroll in &course.scrolls {
        let missing = missing_prerequisites(course, scroll);
        if missing.is_empty() {
            if is_unlocked(course, scroll, progress) {
                report.unlocked.insert(scroll.id.clone());
            }
            continue;
        }

        for missing in missing {
            warn!(
                course_id = %course.id,
                scroll_id = %scroll.id,
                missing = %missing,
                "Unsatisfiable prerequisite; scroll stays locked"
            );
            report
                .diagnostics
                .push(CatalogDiagnostic::UnsatisfiableDependency {
                    scroll_id: scroll.id.clone(),
                    missing: missing.to_string(),
                });
        }
    }

    report
}

/// Scrolls unlocked in `after` that were locked in `before`, in display order.
pub fn newly_unlocked(course: &Course, before: &ProgressStore, after: &ProgressStore) -> Vec<ScrollId> {
    course
        .scrolls
        .iter()
        .filter(|s| is_unlocked(course, s, after) && !is_unlocked(course, s, before))
        .map(|s| s.id.clone())
        .collect()
}

/// First unlocked, uncompleted scroll in display order.
pub fn first_available<'a>(course: &'a Course, progress: &ProgressStore) -> Option<&'a Scroll> {
    course
        .scrolls
        .iter()
        .find(|s| !progress.is_scroll_completed(&s.id) && is_unlocked(course, s, progress))
}

/// Status of one scroll.
pub fn scroll_status(course: &Course, scroll: &Scroll, progress: &ProgressStore) -> ScrollStatus {
    if progress.is_scroll_completed(&scroll.id) {
        ScrollStatus::Completed
    } else if progress.is_active(&scroll.id) {
        ScrollStatus::Active
    } else if is_unlocked(course, scroll, progress) {
        ScrollStatus::Unlocked
    } else {
        ScrollStatus::Locked
    }
}

/// Outline of the course for rendering, in display order.
pub fn scroll_statuses(course: &Course, progress: &ProgressStore) -> Vec<ScrollState> {
    course
        .scrolls
        .iter()
        .enumerate()
        .map(|(i, scroll)| {
            let sections_completed = if progress.is_active(&scroll.id) {
                scroll
                    .section_ids()
                    .filter(|id| progress.is_section_completed(id))
                    .count()
            } else if progress.is_scroll_completed(&scroll.id) {
                scroll.sections.len()
            } else {
                0
            };

            ScrollState {
                scroll_id: scroll.id.clone(),
                number: i + 1,
                title: scroll.title.clone(),
                status: scroll_status(course, scroll, progress),
                reward: scroll.reward,
                sections_completed,
                sections_total: scroll.sections.len(),
                challenge_passed: progress.is_challenge_passed(&scroll.id, &scroll.challenge.id),
            }
        })
        .collect()
}
