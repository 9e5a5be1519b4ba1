//! Dashboard view of a learner's progress.

use serde::{Deserialize, Serialize};

use flame_catalog::Course;
use flame_grading::SubmissionLog;

use crate::types::ProgressStore;
use crate::unlock::resolve_unlocked;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Summary of one learner's standing in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressSnapshot {
    pub user_id: String,
    pub course_id: String,
    pub completed_scrolls: usize,
    pub total_scrolls: usize,
    /// 0.0 to 100.0
    pub percent_complete: f64,
    pub flame_shards_earned: u64,
    /// Declared course total
    pub flame_shards_available: u64,
    pub active_scroll_id: Option<String>,
    /// Display order
    pub unlocked_scroll_ids: Vec<String>,
    /// Display order
    pub completed_scroll_ids: Vec<String>,
    pub pending_submissions: usize,
    pub version: u64,
}

impl ProgressSnapshot {
    /// Whether every scroll of the course is completed.
    pub fn is_finished(&self) -> bool {
        self.total_scrolls > 0 && self.completed_scrolls == self.total_scrolls
    }
}

/// Build a snapshot from a course, a store and its submission log.
pub fn build_snapshot(course: &Course, progress: &ProgressStore, submissions: &SubmissionLog) -> ProgressSnapshot {
    let unlocked = resolve_unlocked(course, progress);
    let completed: Vec<String> = course
        .scroll_ids()
        .filter(|id| progress.is_scroll_completed(id))
        .map(str::to_string)
        .collect();
    let total_scrolls = course.scrolls.len();

    let percent_complete = if total_scrolls == 0 {
        0.0
    } else {
        completed.len() as f64 * 100.0 / total_scrolls as f64
    };

    ProgressSnapshot {
        user_id: progress.user_id.clone(),
        course_id: course.id.clone(),
        completed_scrolls: completed.len(),
        total_scrolls,
        percent_complete,
        flame_shards_earned: progress.total_reward,
        flame_shards_available: course.total_reward,
        active_scroll_id: progress.active_scroll_id.clone(),
        unlocked_scroll_ids: course
            .scroll_ids()
            .filter(|id| unlocked.contains(*id))
            .map(str::to_string)
            .collect(),
        completed_scroll_ids: completed,
        pending_submissions: submissions.pending().count(),
        version: progress.version,
    }
}
