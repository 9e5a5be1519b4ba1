//! Authoring-time consistency checks for course content.
//!
//! Nothing here is fatal. A course with problems still loads; scrolls whose
//! prerequisites can never be met simply stay locked.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{Course, Scroll};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// A content-authoring problem found in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogDiagnostic {
    /// Two scrolls share an id
    DuplicateScroll { scroll_id: String },
    /// Two sections of one scroll share an id
    DuplicateSection { scroll_id: String, section_id: String },
    /// A scroll lists itself as a prerequisite
    SelfPrerequisite { scroll_id: String },
    /// A prerequisite names a scroll that is not in the course
    UnsatisfiableDependency { scroll_id: String, missing: String },
    /// Scrolls that require each other
    PrerequisiteCycle { scroll_ids: Vec<String> },
    /// Declared scroll reward differs from sections + challenge
    ScrollRewardMismatch {
        scroll_id: String,
        declared: u64,
        computed: u64,
    },
    /// Declared course reward differs from the sum of scroll rewards
    CourseRewardMismatch { declared: u64, computed: u64 },
}

impl CatalogDiagnostic {
    /// Whether the problem leaves a scroll permanently locked.
    pub fn blocks_unlocking(&self) -> bool {
        matches!(
            self,
            Self::SelfPrerequisite { .. }
                | Self::UnsatisfiableDependency { .. }
                | Self::PrerequisiteCycle { .. }
        )
    }
}

impl std::fmt::Display for CatalogDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateScroll { scroll_id } => write!(f, "duplicate scroll id '{}'", scroll_id),
            Self::DuplicateSection {
                scroll_id,
                section_id,
            } => write!(f, "duplicate section id '{}' in scroll '{}'", section_id, scroll_id),
            Self::SelfPrerequisite { scroll_id } => {
                write!(f, "scroll '{}' lists itself as a prerequisite", scroll_id)
            }
            Self::UnsatisfiableDependency { scroll_id, missing } => write!(
                f,
                "scroll '{}' requires unknown scroll '{}'",
                scroll_id, missing
            ),
            Self::PrerequisiteCycle { scroll_ids } => {
                write!(f, "prerequisite cycle: {}", scroll_ids.join(" -> "))
            }
            Self::ScrollRewardMismatch {
                scroll_id,
                declared,
                computed,
            } => write!(
                f,
                "scroll '{}' declares {} FlameShards but its parts sum to {}",
                scroll_id, declared, computed
            ),
            Self::CourseRewardMismatch { declared, computed } => write!(
                f,
                "course declares {} FlameShards but its scrolls sum to {}",
                declared, computed
            ),
        }
    }
}

/// Prerequisites of a scroll that do not name a scroll in the course.
pub fn missing_prerequisites<'a>(course: &Course, scroll: &'a Scroll) -> Vec<&'a str> {
    scroll
        .prerequisites
        .iter()
        .map(String::as_str)
        .filter(|p| !course.contains(p))
        .collect()
}

/// Run every check against a course.
pub fn audit_course(course: &Course) -> Vec<CatalogDiagnostic> {
    let mut diagnostics = Vec::new();

    let mut seen_scrolls = HashSet::new();
    for scroll in &course.scrolls {
        if !seen_scrolls.insert(scroll.id.as_str()) {
            diagnostics.push(CatalogDiagnostic::DuplicateScroll {
                scroll_id: scroll.id.clone(),
            });
        }

        let mut seen_sections = HashSet::new();
        for section in &scroll.sections {
            if !seen_sections.insert(section.id.as_str()) {
                diagnostics.push(CatalogDiagnostic::DuplicateSection {
                    scroll_id: scroll.id.clone(),
                    section_id: section.id.clone(),
                });
            }
        }

        if scroll.prerequisites.iter().any(|p| *p == scroll.id) {
            diagnostics.push(CatalogDiagnostic::SelfPrerequisite {
                scroll_id: scroll.id.clone(),
            });
        }

        for missing in missing_prerequisites(course, scroll) {
            diagnostics.push(CatalogDiagnostic::UnsatisfiableDependency {
                scroll_id: scroll.id.clone(),
                missing: missing.to_string(),
            });
        }

        let computed = scroll.computed_reward();
        if computed != scroll.reward {
            diagnostics.push(CatalogDiagnostic::ScrollRewardMismatch {
                scroll_id: scroll.id.clone(),
                declared: scroll.reward,
                computed,
            });
        }
    }

    for scroll_ids in prerequisite_cycles(course) {
        diagnostics.push(CatalogDiagnostic::PrerequisiteCycle { scroll_ids });
    }

    let computed = course.computed_reward();
    if computed != course.total_reward {
        diagnostics.push(CatalogDiagnostic::CourseRewardMismatch {
            declared: course.total_reward,
            computed,
        });
    }

    diagnostics
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Find prerequisite cycles of two or more scrolls.
///
/// Each cycle is reported once, starting from the scroll where the depth-first
/// walk re-entered it.
pub fn prerequisite_cycles(course: &Course) -> Vec<Vec<String>> {
    let mut index: HashMap<&str, &Scroll> = HashMap::new();
    for scroll in &course.scrolls {
        index.entry(scroll.id.as_str()).or_insert(scroll);
    }

    let mut state: HashMap<&str, Visit> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut cycles = Vec::new();

    for scroll in &course.scrolls {
        if !state.contains_key(scroll.id.as_str()) {
            visit(scroll.id.as_str(), &index, &mut state, &mut stack, &mut cycles);
        }
    }

    cycles
}

fn visit<'a>(
    id: &'a str,
    index: &HashMap<&'a str, &'a Scroll>,
    state: &mut HashMap<&'a str, Visit>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    state.insert(id, Visit::InProgress);
    stack.push(id);

    if let Some(scroll) = index.get(id) {
        for prereq in &scroll.prerequisites {
            let prereq = prereq.as_str();
            if prereq == id || !index.contains_key(prereq) {
                continue;
            }
            match state.get(prereq).copied() {
                None => visit(prereq, index, state, stack, cycles),
                Some(Visit::InProgress) => {
                    if let Some(start) = stack.iter().position(|s| *s == prereq) {
                        cycles.push(stack[start..].iter().map(|s| s.to_string()).collect());
                    }
                }
                Some(Visit::Done) => {}
            }
        }
    }

    stack.pop();
    state.insert(id, Visit::Done);
}
