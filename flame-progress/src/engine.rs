//! ProgressEngine - registry of course sessions.

use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use flame_catalog::{require_course, CatalogError, ContentSource};
use flame_grading::{FixedDelayGrader, Grader};

use crate::config::EngineConfig;
use crate::error::{ProgressError, Result};
use crate::events::EventBus;
use crate::repository::ProgressRepository;
use crate::session::CourseSession;
use crate::types::ProgressStore;

type SessionKey = (String, String);

/// Opens and caches one [`CourseSession`] per user×course.
pub struct ProgressEngine {
    /// Configuration
    config: EngineConfig,
    /// Where courses come from
    content: Arc<dyn ContentSource>,
    /// Where progress is kept
    repository: Arc<dyn ProgressRepository>,
    /// Grading backend shared by all sessions
    grader: Arc<dyn Grader>,
    /// Open sessions
    sessions: DashMap<SessionKey, Arc<CourseSession>>,
}

impl ProgressEngine {
    /// Create an engine with the default configuration.
    pub fn new(
        content: Arc<dyn ContentSource>,
        repository: Arc<dyn ProgressRepository>,
        grader: Arc<dyn Grader>,
    ) -> Self {
        Self {
            config: EngineConfig::default(),
            content,
            repository,
            grader,
            sessions: DashMap::new(),
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Create from configuration, grading with the fixed-delay grader.
    pub fn from_config(
        config: EngineConfig,
        content: Arc<dyn ContentSource>,
        repository: Arc<dyn ProgressRepository>,
    ) -> Self {
        let grader = Arc::new(FixedDelayGrader::new(config.grading.fixed_delay()));
        Self::new(content, repository, grader).with_config(config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open (or reuse) the session for a learner in a course.
    ///
    /// Starts from stored progress when the repository has any, otherwise
    /// from an empty record.
    pub async fn open_session(&self, user_id: &str, course_id: &str) -> Result<Arc<CourseSession>> {
        let key = (user_id.to_string(), course_id.to_string());
        if let Some(session) = self.sessions.get(&key) {
            return Ok(session.value().clone());
        }

        let course = require_course(self.content.as_ref(), course_id)
            .await
            .map_err(|e| match e {
                CatalogError::NotFound(id) => ProgressError::CourseNotFound(id),
                other => other.into(),
            })?;

        let progress = match self.repository.load(user_id, course_id).await? {
            Some(progress) => {
                debug!(user_id = %user_id, course_id = %course_id, version = progress.version, "Loaded progress");
                progress
            }
            None => ProgressStore::new(user_id, course_id),
        };
        let submissions = self
            .repository
            .load_submissions(user_id, course_id)
            .await?
            .unwrap_or_default();

        let session = CourseSession::new(course, progress, Arc::clone(&self.grader))
            .with_submissions(submissions)
            .with_config(self.config.progress.clone())
            .with_repository(Arc::clone(&self.repository))
            .with_events(EventBus::new(self.config.events.capacity));
        let session = Arc::new(session);
        session.reconcile_credits().await?;

        info!(user_id = %user_id, course_id = %course_id, "Session opened");

        // a concurrent open may have won the race
        let entry = self.sessions.entry(key).or_insert(session);
        Ok(entry.value().clone())
    }

    /// An already open session.
    pub fn session(&self, user_id: &str, course_id: &str) -> Option<Arc<CourseSession>> {
        self.sessions
            .get(&(user_id.to_string(), course_id.to_string()))
            .map(|s| s.value().clone())
    }

    /// Save and drop a session. Returns whether one was open.
    pub async fn close_session(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let Some((_, session)) = self
            .sessions
            .remove(&(user_id.to_string(), course_id.to_string()))
        else {
            return Ok(false);
        };
        session.save().await?;
        info!(user_id = %user_id, course_id = %course_id, "Session closed");
        Ok(true)
    }

    /// Save every open session. Returns how many were saved.
    pub async fn save_all(&self) -> Result<usize> {
        let sessions: Vec<Arc<CourseSession>> = self.sessions.iter().map(|s| s.value().clone()).collect();
        let results = join_all(sessions.iter().map(|s| s.save())).await;

        let saved = results.len();
        results.into_iter().collect::<Result<Vec<()>>>()?;
        debug!(saved, "Saved all sessions");
        Ok(saved)
    }

    /// Number of open sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
