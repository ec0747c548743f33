//! Core configuration traits

use super::ConfigError;

/// Trait for configuration defaults
pub trait ConfigDefaults {
    /// Get default values for this configuration
    fn defaults() -> Self;
}

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for layering configuration sources
pub trait ConfigMerge {
    /// Apply `KEY=value` overrides on top of this configuration
    fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Merge with environment variables
    fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(std::env::vars())
    }
}
