//! Core types for the progress engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use flame_catalog::{ChallengeId, ScrollId, SectionId};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Completion and reward record for one learner in one course.
///
/// Values are replaced, never mutated in place, by the functions in
/// [`crate::transition`]. Every applied transition bumps `version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStore {
    /// Learner
    pub user_id: String,
    /// Course this record belongs to
    pub course_id: String,
    /// Fully completed scrolls; only grows
    pub completed_scroll_ids: BTreeSet<ScrollId>,
    /// Completed sections of the active scroll only
    pub completed_section_ids: BTreeSet<SectionId>,
    /// FlameShards earned; never decreases
    pub total_reward: u64,
    /// Scroll currently being worked
    pub active_scroll_id: Option<ScrollId>,
    /// Sections whose reward has been paid, per scroll
    #[serde(default)]
    pub credited_sections: BTreeMap<ScrollId, BTreeSet<SectionId>>,
    /// Challenge passed per scroll
    #[serde(default)]
    pub passed_challenges: BTreeMap<ScrollId, ChallengeId>,
    /// Submissions already folded into `total_reward`
    #[serde(default)]
    pub credited_submissions: BTreeSet<String>,
    /// Section state stashed when switching away from a scroll
    /// (per-scroll retention only)
    #[serde(default)]
    pub retained_sections: BTreeMap<ScrollId, BTreeSet<SectionId>>,
    /// Optimistic concurrency counter
    #[serde(default)]
    pub version: u64,
}

impl ProgressStore {
    /// Empty record for a learner starting a course.
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            ..Default::default()
        }
    }

    /// Whether the scroll has been completed.
    pub fn is_scroll_completed(&self, scroll_id: &str) -> bool {
        self.completed_scroll_ids.contains(scroll_id)
    }

    /// Whether the scroll is the active one.
    pub fn is_active(&self, scroll_id: &str) -> bool {
        self.active_scroll_id.as_deref() == Some(scroll_id)
    }

    /// Whether a section of the active scroll is completed.
    pub fn is_section_completed(&self, section_id: &str) -> bool {
        self.completed_section_ids.contains(section_id)
    }

    /// Whether a section's reward was already paid.
    pub fn is_section_credited(&self, scroll_id: &str, section_id: &str) -> bool {
        self.credited_sections
            .get(scroll_id)
            .is_some_and(|s| s.contains(section_id))
    }

    /// Whether the given challenge of a scroll has a credited pass.
    pub fn is_challenge_passed(&self, scroll_id: &str, challenge_id: &str) -> bool {
        self.passed_challenges.get(scroll_id).map(String::as_str) == Some(challenge_id)
    }
}

/// What a transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEffect {
    /// The store changed
    Applied,
    /// Already done before; nothing changed
    AlreadyApplied,
    /// The scroll is not the active one
    InactiveScroll,
    /// The scroll's prerequisites are not met
    Locked,
    /// The scroll is not part of the course
    UnknownScroll,
    /// The submission has not passed
    NotPassed,
    /// The submission is for a challenge the scroll does not have
    ChallengeMismatch,
}

/// Result of a transition: the next store and the FlameShards it granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Store after the transition (equal to the input unless applied)
    pub store: ProgressStore,
    /// FlameShards credited by this transition
    pub awarded: u64,
    /// What happened
    pub effect: TransitionEffect,
}

impl Transition {
    /// A transition that left the store untouched.
    pub fn unchanged(store: &ProgressStore, effect: TransitionEffect) -> Self {
        Self {
            store: store.clone(),
            awarded: 0,
            effect,
        }
    }

    /// A transition that produced a new store.
    pub fn applied(mut store: ProgressStore, awarded: u64) -> Self {
        store.version += 1;
        Self {
            store,
            awarded,
            effect: TransitionEffect::Applied,
        }
    }

    /// Whether the store changed.
    pub fn is_applied(&self) -> bool {
        self.effect == TransitionEffect::Applied
    }
}

/// Which scroll becomes active after a scroll is completed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextScroll {
    /// No active scroll
    #[default]
    Clear,
    /// A specific scroll, if it is unlocked afterwards
    Activate(ScrollId),
    /// First unlocked, uncompleted scroll in display order
    FirstAvailable,
}

/// Display status of a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ScrollStatus {
    /// Prerequisites not met; render disabled
    Locked,
    /// Available to start
    Unlocked,
    /// Currently being worked
    Active,
    /// Finished
    Completed,
}

/// Per-scroll view for rendering a course outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScrollState {
    pub scroll_id: String,
    /// 1-based display number
    pub number: usize,
    pub title: String,
    pub status: ScrollStatus,
    pub reward: u64,
    /// Completed sections (only tracked for the active scroll)
    pub sections_completed: usize,
    pub sections_total: usize,
    pub challenge_passed: bool,
}
