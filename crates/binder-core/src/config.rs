//! Configuration for binder-core
//!
//! Tunables for the mutation engine: merge separator, import title limits,
//! freeform row tolerance, and the fixed set of root folders.

use serde::{Deserialize, Serialize};

/// Separator block inserted between merged documents.
pub const DEFAULT_MERGE_SEPARATOR: &str = "<br/><div class=\"merge-separator\" style=\"text-align:center; color:#ccc; margin: 20px 0;\">***</div><br/>";

/// Binder-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Titles of the root folders, in binder order. The last one is the trash.
    pub roots: Vec<String>,
    /// Split, merge, and import settings
    pub tree: TreeConfig,
    /// Freeform order commit settings
    pub freeform: FreeformConfig,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            roots: vec!["Draft".into(), "Research".into(), "Trash".into()],
            tree: TreeConfig::default(),
            freeform: FreeformConfig::default(),
        }
    }
}

/// Tree mutation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Markup placed between target and source content on merge
    pub merge_separator: String,
    /// Maximum title length (in characters) for imported sections
    pub import_title_max_chars: usize,
    /// Appended to titles cut at `import_title_max_chars`
    pub title_ellipsis: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            merge_separator: DEFAULT_MERGE_SEPARATOR.to_string(),
            import_title_max_chars: 50,
            title_ellipsis: "...".to_string(),
        }
    }
}

/// Freeform layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeformConfig {
    /// Vertical distance (px) within which cards count as the same row
    pub row_tolerance_px: f64,
}

impl Default for FreeformConfig {
    fn default() -> Self {
        Self {
            row_tolerance_px: 50.0,
        }
    }
}

impl BinderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    #[cfg(feature = "toml-config")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    #[cfg(feature = "toml-config")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree.import_title_max_chars == 0 {
            return Err(ConfigError::OutOfRange(
                "import_title_max_chars must be positive".to_string(),
            ));
        }

        let tolerance = self.freeform.row_tolerance_px;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::OutOfRange(
                "row_tolerance_px must be a finite, non-negative number".to_string(),
            ));
        }

        if self.roots.is_empty() {
            return Err(ConfigError::InvalidValue(
                "at least one root (the trash) is required".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value is structurally invalid
    InvalidValue(String),
    /// Value is out of valid range
    OutOfRange(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            ConfigError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BinderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roots.last().map(String::as_str), Some("Trash"));
    }

    #[test]
    fn test_json_serialization() {
        let config = BinderConfig::default();
        let json = config.to_json().unwrap();
        let parsed = BinderConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_negative_tolerance() {
        let mut config = BinderConfig::default();
        config.freeform.row_tolerance_px = -1.0;
        assert!(config.validate().is_err());

        config.freeform.row_tolerance_px = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_title_length() {
        let mut config = BinderConfig::default();
        config.tree.import_title_max_chars = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));
    }

    #[test]
    fn test_empty_roots() {
        let mut config = BinderConfig::default();
        config.roots.clear();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_round_trip() {
        let config = BinderConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert_eq!(BinderConfig::from_toml(&toml_str).unwrap(), config);
    }
}
