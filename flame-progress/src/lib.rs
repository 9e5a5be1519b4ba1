//! Flame Progress - prerequisite-gated progress and reward engine
//!
//! Tracks one learner's way through a course: which scrolls are unlocked,
//! which sections of the active scroll are done, which challenges passed,
//! and how many FlameShards were earned along the way.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    ProgressEngine                        │
//! │   ContentSource ── ProgressRepository ── Grader          │
//! ├─────────────────────────────────────────────────────────┤
//! │              CourseSession (per user×course)             │
//! │   Mutex<ProgressStore + SubmissionLog>   EventBus        │
//! ├─────────────────────────────────────────────────────────┤
//! │                  Pure functions                          │
//! │   unlock::resolve_unlocked     transition::complete_*    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The pure layer never mutates its inputs and never fails for expected
//! control flow: a locked scroll or a repeated completion comes back as a
//! [`Transition`] with a [`TransitionEffect`]. Only completing a scroll too
//! early is an error ([`PreconditionNotMet`]).
//!
//! # Example
//!
//! ```ignore
//! use flame_progress::{transition, unlock, NextScroll, ProgressStore, SectionRetention};
//!
//! let progress = ProgressStore::new("ana", &course.id);
//! let t = transition::activate_scroll(&course, &progress, "kindling", SectionRetention::default());
//! let t = transition::complete_section(&t.store, "kindling", "tinder", 10);
//! assert_eq!(t.awarded, 10);
//! assert!(unlock::resolve_unlocked(&course, &t.store).contains("kindling"));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod repository;
pub mod session;
pub mod snapshot;
pub mod transition;
pub mod types;
pub mod unlock;

// Re-export main types for convenience
pub use config::{EngineConfig, EventConfig, GradingConfig, ProgressConfig, SectionRetention};
pub use engine::ProgressEngine;
pub use error::{PreconditionNotMet, ProgressError, Result};
pub use events::{EventBus, ProgressEvent};
pub use repository::{InMemoryProgressRepository, ProgressRepository};
pub use session::{CourseSession, PendingGrade};
pub use snapshot::{build_snapshot, ProgressSnapshot};
pub use types::{NextScroll, ProgressStore, ScrollState, ScrollStatus, Transition, TransitionEffect};
pub use unlock::{resolve_unlocked, resolve_with_diagnostics, UnlockReport};
