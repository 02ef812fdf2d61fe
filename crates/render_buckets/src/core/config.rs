//! # Bucket Renderer Configuration
//!
//! Settings that tune how the bucket manager draws a scene. They can be
//! kept in a TOML or RON file next to the rest of the engine configuration
//! and loaded through the [`Config`] trait.

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Bucket Configuration
///
/// Controls display-list caching, the slot-merging distance handed to
/// bucket optimization, and pre-allocation of the bucket lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Default log filter used by [`crate::foundation::logging::init_with_level`]
    pub log_level: String,
    /// Whether static mesh slots may be cached in display lists
    pub display_lists: bool,
    /// Merge distance handed to every bucket when optimizing
    pub optimize_distance: f32,
    /// Initial capacity of the solid and alpha bucket lists
    pub initial_bucket_capacity: usize,
}

impl BucketConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            display_lists: true,
            optimize_distance: 10.0,
            initial_bucket_capacity: 16,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable display-list caching
    pub fn with_display_lists(mut self, enabled: bool) -> Self {
        self.display_lists = enabled;
        self
    }

    /// Set the optimize distance
    pub fn with_optimize_distance(mut self, distance: f32) -> Self {
        self.optimize_distance = distance;
        self
    }

    /// Set the initial bucket list capacity
    pub fn with_initial_bucket_capacity(mut self, capacity: usize) -> Self {
        self.initial_bucket_capacity = capacity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.optimize_distance.is_finite() || self.optimize_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "optimize_distance must be a finite non-negative number, got {}",
                self.optimize_distance
            )));
        }

        if self.log_level.is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Install the logger with [`Self::log_level`] as the default filter
    ///
    /// Returns `false` when a logger was already installed.
    pub fn init_logging(&self) -> bool {
        crate::foundation::logging::init_with_level(&self.log_level)
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for BucketConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = BucketConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.display_lists);
        assert_relative_eq!(config.optimize_distance, 10.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BucketConfig::new()
            .with_display_lists(false)
            .with_optimize_distance(2.5)
            .with_log_level("debug");

        let text = config.to_string_with_format(ConfigFormat::Toml).unwrap();
        let parsed = BucketConfig::from_str_with_format(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = BucketConfig::new().with_initial_bucket_capacity(64);

        let text = config.to_string_with_format(ConfigFormat::Ron).unwrap();
        let parsed = BucketConfig::from_str_with_format(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = BucketConfig::from_str_with_format("display_lists = false\n", ConfigFormat::Toml).unwrap();
        assert!(!parsed.display_lists);
        assert_eq!(parsed.initial_bucket_capacity, 16);
    }

    #[test]
    fn test_negative_distance_rejected() {
        let config = BucketConfig::new().with_optimize_distance(-1.0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = BucketConfig::load_from_file("buckets.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("render_buckets_{}.ron", std::process::id()));
        let config = BucketConfig::new().with_optimize_distance(4.0);

        config.save_to_file(&path).unwrap();
        let loaded = BucketConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
