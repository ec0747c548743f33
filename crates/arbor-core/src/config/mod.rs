//! Engine configuration
//!
//! [`TreeConfig`] carries the settings the engine and the materializer share.
//! It can be built in code, parsed from TOML, and layered with `ARBOR_*`
//! environment overrides:
//!
//! ```toml
//! many_roots = true
//! verify_invariants = false
//! spacer = "—"
//! spacer_arrow = "›"
//! ```

mod traits;

pub use traits::{ConfigDefaults, ConfigMerge, ConfigValidation};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "ARBOR_";

/// Default indentation glyph for option labels
pub const DEFAULT_SPACER: &str = "—";

/// Default arrow glyph for option labels
pub const DEFAULT_SPACER_ARROW: &str = "›";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Reading the configuration source failed
    #[error("failed to read configuration: {reason}")]
    Io {
        /// I/O message
        reason: String,
    },

    /// Configuration text did not parse
    #[error("failed to parse configuration: {reason}")]
    Parse {
        /// Parser message
        reason: String,
    },

    /// A value is out of range or malformed
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending setting
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

/// Settings of the nested-set engine and its materializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Whether the relation holds several independent trees
    pub many_roots: bool,

    /// Re-verify touched groups before committing each mutation
    pub verify_invariants: bool,

    /// Indentation glyph for option labels
    pub spacer: String,

    /// Glyph placed after the indentation of nested option labels
    pub spacer_arrow: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ConfigDefaults for TreeConfig {
    fn defaults() -> Self {
        Self {
            many_roots: true,
            verify_invariants: cfg!(debug_assertions),
            spacer: DEFAULT_SPACER.to_string(),
            spacer_arrow: DEFAULT_SPACER_ARROW.to_string(),
        }
    }
}

impl ConfigValidation for TreeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.spacer.is_empty() {
            return Err(ConfigError::invalid("spacer", "must not be empty"));
        }
        Ok(())
    }
}

impl ConfigMerge for TreeConfig {
    fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name.to_ascii_lowercase().as_str() {
                "many_roots" => self.many_roots = parse_flag("many_roots", &value)?,
                "verify_invariants" => {
                    self.verify_invariants = parse_flag("verify_invariants", &value)?
                }
                "spacer" => self.spacer = value,
                "spacer_arrow" => self.spacer_arrow = value,
                other => tracing::debug!(key = %other, "ignoring unknown configuration override"),
            }
        }
        self.validate()
    }
}

fn parse_flag(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(field, format!("expected a boolean, got {other:?}"))),
    }
}

impl TreeConfig {
    /// Configuration for a relation holding exactly one tree
    pub fn single_root() -> Self {
        Self {
            many_roots: false,
            ..Self::defaults()
        }
    }

    /// Enable or disable post-mutation verification
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading tree configuration");
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert!(config.many_roots);
        assert_eq!(config.spacer, DEFAULT_SPACER);
        assert_eq!(config.spacer_arrow, DEFAULT_SPACER_ARROW);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TreeConfig::from_toml_str("many_roots = false\nspacer = \"-\"").unwrap();
        assert!(!config.many_roots);
        assert_eq!(config.spacer, "-");
        assert_eq!(config.spacer_arrow, DEFAULT_SPACER_ARROW);
    }

    #[test]
    fn test_empty_spacer_rejected() {
        let err = TreeConfig::from_toml_str("spacer = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = TreeConfig::from_toml_str("many_roots = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("arbor-config-{}.toml", std::process::id()));
        std::fs::write(&path, "verify_invariants = true\nspacer_arrow = \">\"\n").unwrap();
        let loaded = TreeConfig::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert!(config.verify_invariants);
        assert!(config.many_roots);
        assert_eq!(config.spacer_arrow, ">");

        let missing = TreeConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let mut config = TreeConfig::default();
        config
            .apply_overrides(vec![
                ("ARBOR_MANY_ROOTS".to_string(), "off".to_string()),
                ("ARBOR_SPACER_ARROW".to_string(), ">".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ])
            .unwrap();
        assert!(!config.many_roots);
        assert_eq!(config.spacer_arrow, ">");

        let err = config
            .apply_overrides(vec![("ARBOR_VERIFY_INVARIANTS".to_string(), "maybe".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
