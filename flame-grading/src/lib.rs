//! Flame Grading - challenge submissions and grading backends
//!
//! Tracks challenge submissions through their one-way lifecycle and
//! abstracts the grader that decides them:
//! - Append-only [`SubmissionLog`] with `pending → passed | failed`
//! - Trait-based [`Grader`] backends (fixed-delay approval, scripted mock)
//!
//! # Architecture
//!
//! ```text
//! submit() ──► SubmissionLog (pending) ──► Grader::grade() ... later ...
//!                    ▲                                │
//!                    └──────── resolve(outcome) ◄─────┘
//! ```
//!
//! The log never waits on a grader. Whoever owns both wires the verdict
//! back with [`SubmissionLog::resolve`].

pub mod backend;
pub mod submission;

// Re-export main types for convenience
pub use backend::{FixedDelayGrader, GradeReport, Grader, GradingError, ScriptedGrader};
pub use submission::{
    GradeOutcome, Submission, SubmissionError, SubmissionLog, SubmissionStats, SubmissionStatus,
};
