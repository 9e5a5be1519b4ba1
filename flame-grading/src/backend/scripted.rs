//! Scripted grader for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

use super::traits::*;
use crate::submission::Submission;

/// Grader returning queued verdicts in order.
///
/// Once the queue is empty every submission gets the fallback verdict.
pub struct ScriptedGrader {
    id: String,
    available: AtomicBool,
    script: Mutex<VecDeque<Result<GradeReport, GradingError>>>,
    fallback: GradeReport,
    call_count: AtomicU32,
}

impl ScriptedGrader {
    /// Create a grader that passes everything.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            available: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            fallback: GradeReport::passed(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Queue a verdict.
    pub fn then(mut self, report: GradeReport) -> Self {
        self.script.get_mut().push_back(Ok(report));
        self
    }

    /// Queue a backend failure.
    pub fn then_error(mut self, error: GradingError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Set the verdict used once the queue is drained.
    pub fn with_fallback(mut self, report: GradeReport) -> Self {
        self.fallback = report;
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Number of times grade was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedGrader {
    fn default() -> Self {
        Self::new("scripted")
    }
}

#[async_trait]
impl Grader for ScriptedGrader {
    fn id(&self) -> &str {
        &self.id
    }

    async fn grade(&self, _submission: &Submission) -> Result<GradeReport, GradingError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(GradingError::Unavailable("Scripted grader disabled".to_string()));
        }

        let next = self.script.lock().await.pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
