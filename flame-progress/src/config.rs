//! Configuration for the progress engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to completed sections when the active scroll changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRetention {
    /// Discard section progress of the scroll being left
    #[default]
    ResetOnSwitch,
    /// Keep section progress per scroll and restore it on return
    PerScroll,
}

/// Configuration for a progress engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Progress tracking behavior
    pub progress: ProgressConfig,
    /// Event stream settings
    pub events: EventConfig,
    /// Built-in grader settings
    pub grading: GradingConfig,
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Progress tracking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Section retention across scroll switches
    pub section_retention: SectionRetention,
    /// Persist after every applied transition
    pub autosave: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            section_retention: SectionRetention::ResetOnSwitch,
            autosave: true,
        }
    }
}

/// Event stream configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Broadcast buffer per session; slow subscribers lag beyond this
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Built-in grader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Latency of the fixed-delay grader (ms)
    pub fixed_delay_ms: u64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            fixed_delay_ms: 2000,
        }
    }
}

impl GradingConfig {
    /// Fixed-delay grader latency.
    pub fn fixed_delay(&self) -> Duration {
        Duration::from_millis(self.fixed_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.progress.section_retention, SectionRetention::ResetOnSwitch);
        assert!(config.progress.autosave);
        assert_eq!(config.events.capacity, 256);
        assert_eq!(config.grading.fixed_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = EngineConfig::default();
        config.progress.section_retention = SectionRetention::PerScroll;
        config.grading.fixed_delay_ms = 0;

        let yaml = config.to_yaml().unwrap();
        let parsed = EngineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml(
            r#"
progress:
  section_retention: per_scroll
"#,
        )
        .unwrap();
        assert_eq!(config.progress.section_retention, SectionRetention::PerScroll);
        assert!(config.progress.autosave);
        assert_eq!(config.grading.fixed_delay_ms, 2000);
    }
}
