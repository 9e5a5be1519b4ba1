//! Core traits for grading backends.
//!
//! This module defines the `Grader` trait - the abstraction over whatever
//! decides if a submission satisfies its challenge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::submission::{GradeOutcome, Submission};

/// Error types for grading operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GradingError {
    /// Backend is not available
    #[error("Grader unavailable: {0}")]
    Unavailable(String),

    /// Backend refused to grade the submission (malformed payload, wrong format)
    #[error("Submission rejected by grader: {0}")]
    Rejected(String),

    /// Backend failed while grading
    #[error("Grader error: {0}")]
    Internal(String),
}

/// Verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeReport {
    /// Pass or fail
    pub outcome: GradeOutcome,
    /// FlameShards to grant on a pass; `None` means the challenge's reward
    pub reward: Option<u64>,
    /// Human-readable feedback
    pub feedback: Option<String>,
}

impl GradeReport {
    /// A passing verdict granting the challenge's reward.
    pub fn passed() -> Self {
        Self {
            outcome: GradeOutcome::Passed,
            reward: None,
            feedback: None,
        }
    }

    /// A failing verdict.
    pub fn failed(feedback: impl Into<String>) -> Self {
        Self {
            outcome: GradeOutcome::Failed,
            reward: None,
            feedback: Some(feedback.into()),
        }
    }

    /// Override the reward.
    pub fn with_reward(mut self, reward: u64) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Attach feedback.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Reward to record, falling back to the challenge's own reward.
    ///
    /// Failed verdicts always grant zero.
    pub fn reward_or(&self, challenge_reward: u64) -> u64 {
        match self.outcome {
            GradeOutcome::Passed => self.reward.unwrap_or(challenge_reward),
            GradeOutcome::Failed => 0,
        }
    }
}

/// Core trait for grading backends.
///
/// Grading may take arbitrarily long; callers must not assume it is fast,
/// synchronous or deterministic.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Backend identifier.
    fn id(&self) -> &str;

    /// Grade a pending submission.
    async fn grade(&self, submission: &Submission) -> Result<GradeReport, GradingError>;
}
