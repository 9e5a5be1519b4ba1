//! Challenge submissions and their append-only log.
//!
//! A submission starts `Pending` and moves exactly once to `Passed` or
//! `Failed`. Grading itself happens elsewhere (see [`crate::backend`]); the
//! log only records the lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Lifecycle status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting for the grader
    Pending,
    /// Accepted (terminal)
    Passed,
    /// Rejected (terminal)
    Failed,
}

impl SubmissionStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal verdict delivered by a grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum GradeOutcome {
    Passed,
    Failed,
}

impl From<GradeOutcome> for SubmissionStatus {
    fn from(outcome: GradeOutcome) -> Self {
        match outcome {
            GradeOutcome::Passed => Self::Passed,
            GradeOutcome::Failed => Self::Failed,
        }
    }
}

/// A learner's attempt at a scroll's challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission ID
    pub id: String,
    /// Scroll the challenge belongs to
    pub scroll_id: String,
    /// Challenge attempted
    pub challenge_id: String,
    /// Who submitted
    pub user_id: String,
    /// Submitted answer (code, text, ...)
    pub payload: serde_json::Value,
    /// When it was submitted
    pub submitted_at: DateTime<Utc>,
    /// Current status
    pub status: SubmissionStatus,
    /// FlameShards granted; non-zero only when passed
    pub flame_shards_awarded: u64,
    /// When it reached a terminal status
    pub resolved_at: Option<DateTime<Utc>>,
    /// Grader feedback
    pub feedback: Option<String>,
}

impl Submission {
    /// Create a new pending submission.
    pub fn new(
        scroll_id: impl Into<String>,
        challenge_id: impl Into<String>,
        user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scroll_id: scroll_id.into(),
            challenge_id: challenge_id.into(),
            user_id: user_id.into(),
            payload,
            submitted_at: Utc::now(),
            status: SubmissionStatus::Pending,
            flame_shards_awarded: 0,
            resolved_at: None,
            feedback: None,
        }
    }

    /// Whether the submission passed.
    pub fn is_passed(&self) -> bool {
        self.status == SubmissionStatus::Passed
    }

    /// Whether the submission is still waiting for a verdict.
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

/// Errors from the submission log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// Submission already reached a terminal status
    #[error("Invalid transition: submission {submission_id} is already {status}")]
    InvalidTransition {
        submission_id: String,
        status: SubmissionStatus,
    },

    /// No submission with this id
    #[error("Submission not found: {0}")]
    NotFound(String),
}

/// Append-only log of submissions for one learner and course.
///
/// Entries are never removed or reordered; only the status fields of a
/// pending entry change, once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Submission>", into = "Vec<Submission>")]
pub struct SubmissionLog {
    entries: Vec<Submission>,
    by_id: HashMap<String, usize>,
}

impl From<Vec<Submission>> for SubmissionLog {
    fn from(entries: Vec<Submission>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { entries, by_id }
    }
}

impl From<SubmissionLog> for Vec<Submission> {
    fn from(log: SubmissionLog) -> Self {
        log.entries
    }
}

impl SubmissionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending submission and return it.
    pub fn submit(
        &mut self,
        scroll_id: impl Into<String>,
        challenge_id: impl Into<String>,
        user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Submission {
        let submission = Submission::new(scroll_id, challenge_id, user_id, payload);

        debug!(
            submission_id = %submission.id,
            scroll_id = %submission.scroll_id,
            challenge_id = %submission.challenge_id,
            "Submission recorded"
        );

        self.by_id.insert(submission.id.clone(), self.entries.len());
        self.entries.push(submission.clone());
        submission
    }

    /// Move a pending submission to a terminal status.
    ///
    /// `reward` is granted only for [`GradeOutcome::Passed`].
    pub fn resolve(
        &mut self,
        submission_id: &str,
        outcome: GradeOutcome,
        reward: u64,
    ) -> Result<Submission, SubmissionError> {
        self.resolve_with_feedback(submission_id, outcome, reward, None)
    }

    /// Like [`SubmissionLog::resolve`], also recording grader feedback.
    pub fn resolve_with_feedback(
        &mut self,
        submission_id: &str,
        outcome: GradeOutcome,
        reward: u64,
        feedback: Option<String>,
    ) -> Result<Submission, SubmissionError> {
        let index = *self
            .by_id
            .get(submission_id)
            .ok_or_else(|| SubmissionError::NotFound(submission_id.to_string()))?;
        let submission = &mut self.entries[index];

        if submission.status.is_terminal() {
            warn!(
                submission_id = %submission_id,
                status = %submission.status,
                "Ignoring resolution of terminal submission"
            );
            return Err(SubmissionError::InvalidTransition {
                submission_id: submission_id.to_string(),
                status: submission.status,
            });
        }

        submission.status = outcome.into();
        submission.flame_shards_awarded = match outcome {
            GradeOutcome::Passed => reward,
            GradeOutcome::Failed => 0,
        };
        submission.resolved_at = Some(Utc::now());
        submission.feedback = feedback;

        info!(
            submission_id = %submission_id,
            status = %submission.status,
            awarded = submission.flame_shards_awarded,
            "Submission resolved"
        );

        Ok(submission.clone())
    }

    /// Get a submission by id.
    pub fn get(&self, submission_id: &str) -> Option<&Submission> {
        self.by_id.get(submission_id).map(|&i| &self.entries[i])
    }

    /// All submissions in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Submission> {
        self.entries.iter()
    }

    /// Submissions for a scroll, oldest first.
    pub fn for_scroll<'a>(&'a self, scroll_id: &'a str) -> impl Iterator<Item = &'a Submission> {
        self.entries.iter().filter(move |s| s.scroll_id == scroll_id)
    }

    /// Submissions by a user, oldest first.
    pub fn for_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Submission> {
        self.entries.iter().filter(move |s| s.user_id == user_id)
    }

    /// Submissions still waiting for a verdict.
    pub fn pending(&self) -> impl Iterator<Item = &Submission> {
        self.entries.iter().filter(|s| s.is_pending())
    }

    /// Most recent submission for a challenge.
    ///
    /// A `Failed` result here is what the UI offers a retry for.
    pub fn latest_for_challenge(&self, scroll_id: &str, challenge_id: &str) -> Option<&Submission> {
        self.entries
            .iter()
            .rev()
            .find(|s| s.scroll_id == scroll_id && s.challenge_id == challenge_id)
    }

    /// Whether any submission for the challenge passed.
    pub fn has_passed(&self, scroll_id: &str, challenge_id: &str) -> bool {
        self.entries
            .iter()
            .any(|s| s.scroll_id == scroll_id && s.challenge_id == challenge_id && s.is_passed())
    }

    /// Number of submissions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts per status.
    pub fn stats(&self) -> SubmissionStats {
        let mut stats = SubmissionStats::default();
        for submission in &self.entries {
            match submission.status {
                SubmissionStatus::Pending => stats.pending += 1,
                SubmissionStatus::Passed => stats.passed += 1,
                SubmissionStatus::Failed => stats.failed += 1,
            }
            stats.flame_shards_awarded += submission.flame_shards_awarded;
        }
        stats
    }
}

/// Statistics about a submission log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStats {
    pub pending: usize,
    pub passed: usize,
    pub failed: usize,
    /// Sum of FlameShards granted by passed submissions
    pub flame_shards_awarded: u64,
}
