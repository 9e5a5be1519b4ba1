//! CourseSession - single owner of one learner's progress in one course.
//!
//! The session holds the progress store and the submission log behind one
//! async mutex, so concurrent requests for the same user×course are
//! serialized. Grading runs on spawned tasks and reports back through the
//! same mutex.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use flame_catalog::{Course, ScrollId};
use flame_grading::{GradeOutcome, Grader, Submission, SubmissionLog};

use crate::config::ProgressConfig;
use crate::error::{ProgressError, Result};
use crate::events::{EventBus, ProgressEvent};
use crate::repository::ProgressRepository;
use crate::snapshot::{build_snapshot, ProgressSnapshot};
use crate::transition;
use crate::types::{NextScroll, ProgressStore, ScrollState, Transition, TransitionEffect};
use crate::unlock::{is_unlocked, newly_unlocked, resolve_unlocked, scroll_statuses};

struct SessionState {
    progress: ProgressStore,
    submissions: SubmissionLog,
}

/// A submission handed to the grader.
#[derive(Debug)]
pub struct PendingGrade {
    /// The submission as recorded (always pending)
    pub submission: Submission,
    /// Resolves to the graded submission, or `None` if it stayed pending
    pub handle: JoinHandle<Option<Submission>>,
}

/// One learner working through one course.
pub struct CourseSession {
    /// Learner
    user_id: String,
    /// Course definition
    course: Arc<Course>,
    /// Progress behavior
    config: ProgressConfig,
    /// Progress and submissions
    state: Mutex<SessionState>,
    /// Grading backend
    grader: Arc<dyn Grader>,
    /// Where progress is persisted, if anywhere
    repository: Option<Arc<dyn ProgressRepository>>,
    /// Progress notifications
    events: EventBus,
}

impl CourseSession {
    /// Create a session over existing progress.
    pub fn new(course: Arc<Course>, progress: ProgressStore, grader: Arc<dyn Grader>) -> Self {
        Self {
            user_id: progress.user_id.clone(),
            course,
            config: ProgressConfig::default(),
            state: Mutex::new(SessionState {
                progress,
                submissions: SubmissionLog::new(),
            }),
            grader,
            repository: None,
            events: EventBus::default(),
        }
    }

    /// Start from a previously recorded submission log.
    pub fn with_submissions(mut self, submissions: SubmissionLog) -> Self {
        self.state.get_mut().submissions = submissions;
        self
    }

    /// Set progress behavior.
    pub fn with_config(mut self, config: ProgressConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist through a repository.
    pub fn with_repository(mut self, repository: Arc<dyn ProgressRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Publish on a specific bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Learner id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Course definition.
    pub fn course(&self) -> &Arc<Course> {
        &self.course
    }

    /// Current progress.
    pub async fn progress(&self) -> ProgressStore {
        self.state.lock().await.progress.clone()
    }

    /// Current submission log.
    pub async fn submissions(&self) -> SubmissionLog {
        self.state.lock().await.submissions.clone()
    }

    /// Most recent submission for a scroll's challenge.
    pub async fn latest_submission(&self, scroll_id: &str) -> Option<Submission> {
        let scroll = self.course.scroll(scroll_id)?;
        let state = self.state.lock().await;
        state
            .submissions
            .latest_for_challenge(scroll_id, &scroll.challenge.id)
            .cloned()
    }

    /// Ids of unlocked scrolls.
    pub async fn unlocked(&self) -> BTreeSet<ScrollId> {
        let state = self.state.lock().await;
        resolve_unlocked(&self.course, &state.progress)
    }

    /// Course outline with statuses.
    pub async fn scroll_statuses(&self) -> Vec<ScrollState> {
        let state = self.state.lock().await;
        scroll_statuses(&self.course, &state.progress)
    }

    /// Dashboard summary.
    pub async fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().await;
        build_snapshot(&self.course, &state.progress, &state.submissions)
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> BroadcastStream<ProgressEvent> {
        self.events.subscribe()
    }

    /// The session's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Make a scroll the active one.
    ///
    /// Locked and unknown scrolls leave progress untouched; check the
    /// returned effect.
    pub async fn activate_scroll(&self, scroll_id: &str) -> Result<Transition> {
        let mut state = self.state.lock().await;
        let t = transition::activate_scroll(
            &self.course,
            &state.progress,
            scroll_id,
            self.config.section_retention,
        );

        if t.is_applied() {
            self.commit(&mut state, &t).await?;
            debug!(user_id = %self.user_id, scroll_id = %scroll_id, "Scroll activated");
            self.events.publish(ProgressEvent::ScrollActivated {
                scroll_id: scroll_id.to_string(),
            });
        }
        Ok(t)
    }

    /// Complete a section, crediting its reward from the catalog.
    pub async fn complete_section(&self, scroll_id: &str, section_id: &str) -> Result<Transition> {
        let scroll = self
            .course
            .scroll(scroll_id)
            .ok_or_else(|| ProgressError::UnknownScroll(scroll_id.to_string()))?;
        let section = scroll.section(section_id).ok_or_else(|| ProgressError::UnknownSection {
            scroll_id: scroll_id.to_string(),
            section_id: section_id.to_string(),
        })?;

        let mut state = self.state.lock().await;
        let t = transition::complete_section(&state.progress, scroll_id, section_id, section.reward);

        if t.is_applied() {
            self.commit(&mut state, &t).await?;
            self.events.publish(ProgressEvent::SectionCompleted {
                scroll_id: scroll_id.to_string(),
                section_id: section_id.to_string(),
                awarded: t.awarded,
            });
        }
        Ok(t)
    }

    /// Complete a scroll and pick what to work on next.
    pub async fn complete_scroll(&self, scroll_id: &str, next: NextScroll) -> Result<Transition> {
        let mut state = self.state.lock().await;
        let t = transition::complete_scroll(&self.course, &state.progress, scroll_id, next)?;
        if !t.is_applied() {
            return Ok(t);
        }

        let unlocked = newly_unlocked(&self.course, &state.progress, &t.store);
        self.commit(&mut state, &t).await?;

        info!(
            user_id = %self.user_id,
            course_id = %self.course.id,
            scroll_id = %scroll_id,
            total_reward = t.store.total_reward,
            "Scroll completed"
        );
        self.events.publish(ProgressEvent::ScrollCompleted {
            scroll_id: scroll_id.to_string(),
        });
        if !unlocked.is_empty() {
            self.events.publish(ProgressEvent::ScrollsUnlocked { scroll_ids: unlocked });
        }
        if let Some(active) = &t.store.active_scroll_id {
            self.events.publish(ProgressEvent::ScrollActivated {
                scroll_id: active.clone(),
            });
        }
        Ok(t)
    }

    /// Submit an attempt at a scroll's challenge and grade it in the background.
    ///
    /// Returns as soon as the pending submission is recorded. The grade is
    /// folded into progress when the grader answers; a grader failure leaves
    /// the submission pending.
    pub async fn submit_challenge(self: &Arc<Self>, scroll_id: &str, payload: serde_json::Value) -> Result<PendingGrade> {
        let scroll = self
            .course
            .scroll(scroll_id)
            .ok_or_else(|| ProgressError::UnknownScroll(scroll_id.to_string()))?;
        let challenge_reward = scroll.challenge.reward;

        let submission = {
            let mut state = self.state.lock().await;
            if !is_unlocked(&self.course, scroll, &state.progress) {
                return Err(ProgressError::ScrollLocked(scroll_id.to_string()));
            }

            // recorded only once the log is saved
            let mut submissions = state.submissions.clone();
            let submission = submissions.submit(
                scroll_id,
                scroll.challenge.id.as_str(),
                self.user_id.as_str(),
                payload,
            );
            self.persist_submissions(&submissions).await?;
            state.submissions = submissions;
            submission
        };

        self.events.publish(ProgressEvent::SubmissionCreated {
            submission_id: submission.id.clone(),
            scroll_id: scroll_id.to_string(),
        });

        let session = Arc::clone(self);
        let pending = submission.clone();
        let handle = tokio::spawn(async move { session.grade(pending, challenge_reward).await });

        Ok(PendingGrade { submission, handle })
    }

    async fn grade(&self, submission: Submission, challenge_reward: u64) -> Option<Submission> {
        let report = match self.grader.grade(&submission).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    grader = %self.grader.id(),
                    submission_id = %submission.id,
                    error = %e,
                    "Grading failed; submission stays pending"
                );
                return None;
            }
        };

        let reward = report.reward_or(challenge_reward);
        match self
            .resolve_with_feedback(&submission.id, report.outcome, reward, report.feedback)
            .await
        {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!(submission_id = %submission.id, error = %e, "Could not record grade");
                None
            }
        }
    }

    /// Record a verdict for a pending submission and credit a pass.
    pub async fn resolve_submission(&self, submission_id: &str, outcome: GradeOutcome, reward: u64) -> Result<Submission> {
        self.resolve_with_feedback(submission_id, outcome, reward, None).await
    }

    async fn resolve_with_feedback(
        &self,
        submission_id: &str,
        outcome: GradeOutcome,
        reward: u64,
        feedback: Option<String>,
    ) -> Result<Submission> {
        let mut state = self.state.lock().await;

        // the verdict and its credit are installed together, after both saves
        let mut submissions = state.submissions.clone();
        let resolved = submissions.resolve_with_feedback(submission_id, outcome, reward, feedback)?;
        let t = transition::credit_submission(&self.course, &state.progress, &resolved);

        self.persist_submissions(&submissions).await?;
        if t.is_applied() {
            self.commit(&mut state, &t).await?;
        }
        state.submissions = submissions;

        self.events.publish(ProgressEvent::SubmissionResolved {
            submission_id: resolved.id.clone(),
            scroll_id: resolved.scroll_id.clone(),
            status: resolved.status,
            awarded: t.awarded,
        });
        Ok(resolved)
    }

    /// Credit passed submissions the progress store has not seen yet.
    ///
    /// Covers logs and stores persisted at different moments. Returns the
    /// FlameShards credited.
    pub async fn reconcile_credits(&self) -> Result<u64> {
        let mut state = self.state.lock().await;

        let mut progress = state.progress.clone();
        let mut awarded = 0;
        for submission in state.submissions.iter().filter(|s| s.is_passed()) {
            let t = transition::credit_submission(&self.course, &progress, submission);
            awarded += t.awarded;
            progress = t.store;
        }

        if progress.version != state.progress.version {
            // each credit already bumped the version
            let t = Transition {
                store: progress,
                awarded,
                effect: TransitionEffect::Applied,
            };
            self.commit(&mut state, &t).await?;
            info!(user_id = %self.user_id, course_id = %self.course.id, awarded, "Reconciled submission credits");
        }
        Ok(awarded)
    }

    /// Persist progress and submissions now.
    pub async fn save(&self) -> Result<()> {
        let state = self.state.lock().await;
        let Some(repository) = &self.repository else {
            debug!(user_id = %self.user_id, "No repository configured; nothing saved");
            return Ok(());
        };
        repository
            .save(&self.user_id, &self.course.id, &state.progress)
            .await?;
        repository
            .save_submissions(&self.user_id, &self.course.id, &state.submissions)
            .await
    }

    /// Install an applied transition, saving first when autosave is on.
    async fn commit(&self, state: &mut SessionState, t: &Transition) -> Result<()> {
        if self.config.autosave {
            if let Some(repository) = &self.repository {
                repository.save(&self.user_id, &self.course.id, &t.store).await?;
            }
        }
        state.progress = t.store.clone();
        Ok(())
    }

    async fn persist_submissions(&self, submissions: &SubmissionLog) -> Result<()> {
        match &self.repository {
            Some(repository) if self.config.autosave => {
                repository
                    .save_submissions(&self.user_id, &self.course.id, submissions)
                    .await
            }
            _ => Ok(()),
        }
    }
}
