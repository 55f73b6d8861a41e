//! Shared configuration for the shape key tools
//!
//! This crate is the single source of truth for the values every split,
//! merge and mirror operation agrees on: which axis separates left from
//! right, how wide the tolerance band around the seam is, which glyphs mark
//! a left/right shape key, and the MMD alias pairs whose names do not follow
//! the suffix rule.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default half-width of the seam tolerance band, in mesh units
pub const DEFAULT_TOLERANCE: f32 = 0.001;

/// Default glyph marking a left-side shape key
pub const DEFAULT_LEFT_MARKER: &str = "左";

/// Default glyph marking a right-side shape key
pub const DEFAULT_RIGHT_MARKER: &str = "右";

/// MMD alias pairs: canonical name, generated left name, generated right name
pub const MMD_ALIAS_PAIRS: [(&str, &str, &str); 2] = [
    ("まばたき", "ウィンク2", "ｳｨﾝｸ2右"),
    ("笑い", "ウィンク", "ウィンク右"),
];

/// Coordinate axis used for the left/right partition and for mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index of this axis in an `[x, y, z]` vector
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// One irregular left/right naming pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPair {
    /// Name of the combined (unsplit) shape key
    pub canonical: String,
    /// Name given to the left half
    pub left: String,
    /// Name given to the right half
    pub right: String,
}

impl AliasPair {
    pub fn new(canonical: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Errors raised while loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f32),

    #[error("Marker glyphs must be non-empty and distinct")]
    InvalidMarkers,

    #[error("Alias name '{0}' is used more than once")]
    DuplicateAlias(String),
}

/// Configuration shared by all shape key operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct ShapeKeyConfig {
    /// Axis whose sign (in the Basis pose) decides left vs right
    pub axis: Axis,
    /// Half-width of the band around the seam
    pub tolerance: f32,
    /// Suffix glyph of left-side shape keys
    pub left_marker: String,
    /// Suffix glyph of right-side shape keys
    pub right_marker: String,
    /// Irregular third-party name pairs
    pub alias_pairs: Vec<AliasPair>,
}

impl Default for ShapeKeyConfig {
    fn default() -> Self {
        Self {
            axis: Axis::default(),
            tolerance: DEFAULT_TOLERANCE,
            left_marker: DEFAULT_LEFT_MARKER.to_string(),
            right_marker: DEFAULT_RIGHT_MARKER.to_string(),
            alias_pairs: mmd_alias_pairs(),
        }
    }
}

impl ShapeKeyConfig {
    /// Parse and validate a configuration from JSON.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check tolerance, markers and alias uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if self.left_marker.is_empty()
            || self.right_marker.is_empty()
            || self.left_marker == self.right_marker
        {
            return Err(ConfigError::InvalidMarkers);
        }

        let mut seen = HashSet::new();
        for pair in &self.alias_pairs {
            for name in [&pair.canonical, &pair.left, &pair.right] {
                if !seen.insert(name.as_str()) {
                    return Err(ConfigError::DuplicateAlias(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Whether the alias pairs are exactly the built-in MMD table
    pub fn uses_mmd_aliases(&self) -> bool {
        self.alias_pairs == mmd_alias_pairs()
    }
}

/// The built-in MMD alias pairs as owned values
pub fn mmd_alias_pairs() -> Vec<AliasPair> {
    MMD_ALIAS_PAIRS
        .iter()
        .map(|&(canonical, left, right)| AliasPair::new(canonical, left, right))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShapeKeyConfig::default();
        assert_eq!(config.axis, Axis::X);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.left_marker, "左");
        assert_eq!(config.right_marker, "右");
        assert_eq!(config.alias_pairs.len(), 2);
        assert!(config.uses_mmd_aliases());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ShapeKeyConfig::from_json(r#"{ "axis": "Z", "tolerance": 0.01 }"#).unwrap();
        assert_eq!(config.axis, Axis::Z);
        assert_eq!(config.axis.index(), 2);
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.left_marker, DEFAULT_LEFT_MARKER);
        assert!(config.uses_mmd_aliases());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ShapeKeyConfig {
            left_marker: ".L".to_string(),
            right_marker: ".R".to_string(),
            alias_pairs: vec![AliasPair::new("blink", "wink_a", "wink_b")],
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        let parsed = ShapeKeyConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(!parsed.uses_mmd_aliases());
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let result = ShapeKeyConfig::from_json(r#"{ "tolerance": -1.0 }"#);
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));
    }

    #[test]
    fn test_rejects_identical_markers() {
        let config = ShapeKeyConfig {
            right_marker: DEFAULT_LEFT_MARKER.to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMarkers)));
    }

    #[test]
    fn test_rejects_duplicate_alias_names() {
        let mut config = ShapeKeyConfig::default();
        config
            .alias_pairs
            .push(AliasPair::new("other", "ウィンク", "other_r"));
        match config.validate() {
            Err(ConfigError::DuplicateAlias(name)) => assert_eq!(name, "ウィンク"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ShapeKeyConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
