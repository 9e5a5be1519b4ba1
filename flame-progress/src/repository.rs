//! Persistence collaborator.
//!
//! The engine works on in-memory [`ProgressStore`] values; durability is the
//! repository's business.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use flame_grading::SubmissionLog;

use crate::error::{ProgressError, Result};
use crate::types::ProgressStore;

/// Loads and saves progress per user×course.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the stored progress, if any.
    async fn load(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressStore>>;

    /// Persist progress.
    async fn save(&self, user_id: &str, course_id: &str, progress: &ProgressStore) -> Result<()>;

    /// Load the submission log. Repositories without submission storage
    /// start every session with an empty log.
    async fn load_submissions(&self, _user_id: &str, _course_id: &str) -> Result<Option<SubmissionLog>> {
        Ok(None)
    }

    /// Persist the submission log.
    async fn save_submissions(&self, _user_id: &str, _course_id: &str, _log: &SubmissionLog) -> Result<()> {
        Ok(())
    }
}

type Key = (String, String);

fn key(user_id: &str, course_id: &str) -> Key {
    (user_id.to_string(), course_id.to_string())
}

/// In-memory repository with version checking.
///
/// A save must carry a version above the stored one, unless it repeats the
/// stored record exactly.
#[derive(Debug, Default)]
pub struct InMemoryProgressRepository {
    progress: DashMap<Key, ProgressStore>,
    submissions: DashMap<Key, SubmissionLog>,
}

impl InMemoryProgressRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored progress records.
    pub fn len(&self) -> usize {
        self.progress.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    /// Persisted version for a user×course.
    pub fn stored_version(&self, user_id: &str, course_id: &str) -> Option<u64> {
        self.progress.get(&key(user_id, course_id)).map(|p| p.version)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn load(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressStore>> {
        Ok(self.progress.get(&key(user_id, course_id)).map(|p| p.clone()))
    }

    async fn save(&self, user_id: &str, course_id: &str, progress: &ProgressStore) -> Result<()> {
        if progress.user_id != user_id || progress.course_id != course_id {
            return Err(ProgressError::Persistence(format!(
                "record for {}/{} saved under {}/{}",
                progress.user_id, progress.course_id, user_id, course_id
            )));
        }

        match self.progress.entry(key(user_id, course_id)) {
            Entry::Occupied(mut entry) => {
                // each version is written once; re-saving the same record is allowed
                let stored = entry.get().version;
                if stored > progress.version || (stored == progress.version && entry.get() != progress) {
                    warn!(
                        user_id = %user_id,
                        course_id = %course_id,
                        stored,
                        attempted = progress.version,
                        "Rejected stale progress write"
                    );
                    return Err(ProgressError::StaleWrite {
                        user_id: user_id.to_string(),
                        course_id: course_id.to_string(),
                        stored,
                        attempted: progress.version,
                    });
                }
                entry.insert(progress.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(progress.clone());
            }
        }

        debug!(user_id = %user_id, course_id = %course_id, version = progress.version, "Progress saved");
        Ok(())
    }

    async fn load_submissions(&self, user_id: &str, course_id: &str) -> Result<Option<SubmissionLog>> {
        Ok(self.submissions.get(&key(user_id, course_id)).map(|l| l.clone()))
    }

    async fn save_submissions(&self, user_id: &str, course_id: &str, log: &SubmissionLog) -> Result<()> {
        self.submissions.insert(key(user_id, course_id), log.clone());
        Ok(())
    }
}
