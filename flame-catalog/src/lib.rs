//! Course Catalog for the Sacred Flame learning engine
//!
//! Read-only definitions of the content a learner works through:
//!
//! - **Course**: an ordered set of scrolls with a denormalized reward total
//! - **Scroll**: ordered sections, a terminal challenge, prerequisite scrolls
//! - **Section**: a rewarded unit of lesson content
//! - **Challenge**: the graded exercise that closes a scroll
//!
//! Rewards are counted in FlameShards. Content-specific fields (lesson text,
//! starter code, quiz data) live in opaque JSON payloads the engine never
//! inspects.
//!
//! # Key Components
//!
//! - [`Course`] and friends: the catalog object graph
//! - [`CatalogNode`]: common shape of every rewardable node
//! - [`ContentSource`]: trait for whatever supplies courses
//! - [`audit_course`]: authoring-time consistency checks
//!
//! # Example
//!
//! ```ignore
//! use flame_catalog::{Challenge, Course, Scroll, Section};
//!
//! let course = Course::new("forging-flame", "Forging the Flame").with_scroll(
//!     Scroll::new("kindling", "Kindling", Challenge::new("first-spark", 25))
//!         .with_section(Section::new("tinder", 10))
//!         .with_section(Section::new("breath", 15)),
//! );
//! assert_eq!(course.total_reward, 50);
//! ```

pub mod audit;
pub mod error;
pub mod source;
pub mod types;

// Re-export main types
pub use audit::{audit_course, missing_prerequisites, prerequisite_cycles, CatalogDiagnostic};
pub use error::{CatalogError, Result};
pub use source::{require_course, ContentSource, InMemoryContentSource};
pub use types::*;
