//! Catalog types: courses, scrolls, sections and challenges.
//!
//! A course is authored content. The progress engine only reads ids,
//! rewards and prerequisites; everything content-specific lives in the
//! opaque `payload` fields.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Scrolls carry no payload of their own.
static NO_PAYLOAD: serde_json::Value = serde_json::Value::Null;

/// Identifier of a course.
pub type CourseId = String;
/// Identifier of a scroll, unique within its course.
pub type ScrollId = String;
/// Identifier of a section, unique within its scroll.
pub type SectionId = String;
/// Identifier of a challenge.
pub type ChallengeId = String;

/// Common shape shared by every rewardable node of the catalog.
pub trait CatalogNode {
    /// The node's identifier.
    fn node_id(&self) -> &str;

    /// FlameShards granted for finishing this node.
    fn reward(&self) -> u64;

    /// Content the engine never inspects.
    fn payload(&self) -> &serde_json::Value;
}

/// A course: an ordered collection of scrolls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course identifier
    pub id: CourseId,
    /// Display title
    pub title: String,
    /// Scrolls in display order (order does not gate unlocking)
    #[serde(default)]
    pub scrolls: Vec<Scroll>,
    /// Denormalized sum of scroll rewards
    #[serde(default)]
    pub total_reward: u64,
}

impl Course {
    /// Create an empty course.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            scrolls: Vec::new(),
            total_reward: 0,
        }
    }

    /// Append a scroll and keep `total_reward` in sync.
    pub fn with_scroll(mut self, scroll: Scroll) -> Self {
        self.scrolls.push(scroll);
        self.total_reward = self.computed_reward();
        self
    }

    /// Scroll ids in display order.
    pub fn scroll_ids(&self) -> impl Iterator<Item = &str> {
        self.scrolls.iter().map(|s| s.id.as_str())
    }

    /// Look up a scroll by id.
    pub fn scroll(&self, scroll_id: &str) -> Option<&Scroll> {
        self.scrolls.iter().find(|s| s.id == scroll_id)
    }

    /// Whether the course contains the given scroll.
    pub fn contains(&self, scroll_id: &str) -> bool {
        self.scroll(scroll_id).is_some()
    }

    /// 1-based display number of a scroll.
    pub fn position(&self, scroll_id: &str) -> Option<usize> {
        self.scrolls
            .iter()
            .position(|s| s.id == scroll_id)
            .map(|i| i + 1)
    }

    /// Sum of the declared rewards of every scroll.
    pub fn computed_reward(&self) -> u64 {
        self.scrolls.iter().fold(0u64, |acc, s| acc.saturating_add(s.reward))
    }

    /// Parse a course from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Parse a course from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

/// A scroll: the unit of prerequisite-gated unlocking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scroll {
    /// Scroll identifier
    pub id: ScrollId,
    /// Display title
    pub title: String,
    /// Sections in reading order
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Terminal graded exercise
    pub challenge: Challenge,
    /// Scrolls that must be completed first
    #[serde(default)]
    pub prerequisites: Vec<ScrollId>,
    /// Sum of section rewards plus the challenge reward
    #[serde(default)]
    pub reward: u64,
}

impl Scroll {
    /// Create a scroll with no sections and no prerequisites.
    pub fn new(id: impl Into<String>, title: impl Into<String>, challenge: Challenge) -> Self {
        let reward = challenge.reward;
        Self {
            id: id.into(),
            title: title.into(),
            sections: Vec::new(),
            challenge,
            prerequisites: Vec::new(),
            reward,
        }
    }

    /// Append a section and keep `reward` in sync.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self.reward = self.computed_reward();
        self
    }

    /// Add a prerequisite scroll.
    pub fn with_prerequisite(mut self, scroll_id: impl Into<String>) -> Self {
        self.prerequisites.push(scroll_id.into());
        self
    }

    /// Section ids in reading order.
    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.id.as_str())
    }

    /// Look up a section by id.
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Sum of section rewards plus the challenge reward.
    pub fn computed_reward(&self) -> u64 {
        self.sections
            .iter()
            .fold(self.challenge.reward, |acc, s| acc.saturating_add(s.reward))
    }

    /// Whether the scroll is unlocked from the start.
    pub fn is_entry_point(&self) -> bool {
        self.prerequisites.is_empty()
    }
}

impl CatalogNode for Scroll {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn reward(&self) -> u64 {
        self.reward
    }

    fn payload(&self) -> &serde_json::Value {
        &NO_PAYLOAD
    }
}

/// A section of a scroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier
    pub id: SectionId,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// FlameShards for completing the section
    #[serde(default)]
    pub reward: u64,
    /// Lesson content
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Section {
    /// Create a section with an empty payload.
    pub fn new(id: impl Into<String>, reward: u64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            reward,
            payload: serde_json::Value::Null,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the content payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl CatalogNode for Section {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn reward(&self) -> u64 {
        self.reward
    }

    fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

/// The terminal graded exercise of a scroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Challenge identifier
    pub id: ChallengeId,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// FlameShards for a passed submission
    #[serde(default)]
    pub reward: u64,
    /// Prompt, starter code, test cases
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Expected submission format (e.g. "python", "text")
    #[serde(default)]
    pub submission_format: String,
}

impl Challenge {
    /// Create a challenge with an empty payload.
    pub fn new(id: impl Into<String>, reward: u64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            reward,
            payload: serde_json::Value::Null,
            submission_format: "text".to_string(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the expected submission format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.submission_format = format.into();
        self
    }

    /// Set the content payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl CatalogNode for Challenge {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn reward(&self) -> u64 {
        self.reward
    }

    fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}
