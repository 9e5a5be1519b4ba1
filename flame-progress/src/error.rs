//! Error types for the progress engine.

use flame_catalog::CatalogError;
use flame_grading::SubmissionError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// A scroll was asked to complete before its sections and challenge were done.
///
/// Recoverable: the caller keeps the current state and may re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Scroll {scroll_id} is not ready: {} section(s) missing, challenge passed: {challenge_passed}",
    .missing_sections.len()
)]
pub struct PreconditionNotMet {
    /// Scroll that was asked to complete
    pub scroll_id: String,
    /// Sections not yet completed in the active scroll
    pub missing_sections: Vec<String>,
    /// Whether the challenge has a credited pass
    pub challenge_passed: bool,
}

/// Progress engine error types.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Scroll completion requested too early
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(#[from] PreconditionNotMet),

    /// Submission lifecycle violation
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Content source failure
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Course does not exist
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    /// Scroll is not part of the course
    #[error("Unknown scroll: {0}")]
    UnknownScroll(String),

    /// Section is not part of the scroll
    #[error("Unknown section {section_id} in scroll {scroll_id}")]
    UnknownSection {
        scroll_id: String,
        section_id: String,
    },

    /// Scroll's prerequisites are not met
    #[error("Scroll is locked: {0}")]
    ScrollLocked(String),

    /// A newer version of the record was already persisted
    #[error("Stale write for {user_id}/{course_id}: stored version {stored}, attempted {attempted}")]
    StaleWrite {
        user_id: String,
        course_id: String,
        stored: u64,
        attempted: u64,
    },

    /// Persistence collaborator failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for ProgressError {
    fn from(err: serde_yaml::Error) -> Self {
        ProgressError::Config(err.to_string())
    }
}
