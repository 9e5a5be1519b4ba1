//! Always-approve grader with a fixed latency.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::traits::*;
use crate::submission::Submission;

/// Default latency before approval.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Grader that approves every submission after a fixed delay.
///
/// Stands in for real review until one exists.
#[derive(Debug, Clone)]
pub struct FixedDelayGrader {
    delay: Duration,
    feedback: String,
}

impl FixedDelayGrader {
    /// Create a grader with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            feedback: "The flame accepts your offering.".to_string(),
        }
    }

    /// Set the approval feedback.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelayGrader {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

#[async_trait]
impl Grader for FixedDelayGrader {
    fn id(&self) -> &str {
        "fixed-delay"
    }

    async fn grade(&self, submission: &Submission) -> Result<GradeReport, GradingError> {
        debug!(
            submission_id = %submission.id,
            delay_ms = self.delay.as_millis() as u64,
            "Grading with fixed delay"
        );
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GradeReport::passed().with_feedback(self.feedback.clone()))
    }
}
