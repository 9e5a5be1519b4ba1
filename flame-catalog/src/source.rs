//! Content sources supplying course definitions.
//!
//! The engine treats the source as authoritative and assumes the content is
//! internally consistent; [`crate::audit`] reports where it is not.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::audit::audit_course;
use crate::error::{CatalogError, Result};
use crate::types::Course;

/// Trait for anything that can hand out course definitions.
///
/// Implementations may be backed by authored files, a content service or a
/// fixture table in tests.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch a course by id. `Ok(None)` means the course does not exist.
    async fn course(&self, course_id: &str) -> Result<Option<Arc<Course>>>;

    /// Ids of every course this source knows about.
    async fn course_ids(&self) -> Result<Vec<String>>;
}

/// Content source holding courses in memory.
#[derive(Default)]
pub struct InMemoryContentSource {
    courses: Arc<RwLock<HashMap<String, Arc<Course>>>>,
}

impl InMemoryContentSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-populated with courses.
    pub fn with_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        let map = courses
            .into_iter()
            .map(|c| (c.id.clone(), Arc::new(c)))
            .collect();
        Self {
            courses: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a course. Audit findings are logged, not rejected.
    pub async fn insert(&self, course: Course) {
        for diagnostic in audit_course(&course) {
            warn!(course_id = %course.id, %diagnostic, "Course content issue");
        }

        info!(
            course_id = %course.id,
            scrolls = course.scrolls.len(),
            "Registering course"
        );

        let mut courses = self.courses.write().await;
        courses.insert(course.id.clone(), Arc::new(course));
    }

    /// Parse a YAML document and register the course it describes.
    pub async fn load_yaml(&self, yaml: &str) -> Result<String> {
        let course = Course::from_yaml(yaml)?;
        let id = course.id.clone();
        self.insert(course).await;
        Ok(id)
    }

    /// Read a YAML file and register the course it describes.
    pub async fn load_yaml_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading course file");
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Source(format!("{}: {}", path.display(), e)))?;
        self.load_yaml(&yaml).await
    }

    /// Remove a course.
    pub async fn remove(&self, course_id: &str) -> Option<Arc<Course>> {
        self.courses.write().await.remove(course_id)
    }

    /// Number of registered courses.
    pub async fn len(&self) -> usize {
        self.courses.read().await.len()
    }

    /// Whether no course is registered.
    pub async fn is_empty(&self) -> bool {
        self.courses.read().await.is_empty()
    }
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    async fn course(&self, course_id: &str) -> Result<Option<Arc<Course>>> {
        Ok(self.courses.read().await.get(course_id).cloned())
    }

    async fn course_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.courses.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Fetch a course, turning absence into [`CatalogError::NotFound`].
pub async fn require_course(source: &dyn ContentSource, course_id: &str) -> Result<Arc<Course>> {
    source
        .course(course_id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(course_id.to_string()))
}
