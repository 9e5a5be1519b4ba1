//! Grading backends.
//!
//! Grading is an opaque asynchronous collaborator. Implementations may be
//! a human review queue, an automated test runner or a stub:
//! - Fixed-delay approval (the site's original behavior)
//! - Scripted backend for testing

pub mod fixed_delay;
pub mod scripted;
pub mod traits;

pub use fixed_delay::FixedDelayGrader;
pub use scripted::ScriptedGrader;
pub use traits::{GradeReport, Grader, GradingError};
