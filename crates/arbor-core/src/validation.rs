//! Payload validation
//!
//! Validation of non-tree attributes is owned by the caller; the engine only
//! needs to ask whether a payload is acceptable before it touches storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Attribute the failure belongs to
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

/// Collected field-level validation failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding one failure
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no failure was recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Recorded failures in insertion order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First field that failed
    pub fn first_field(&self) -> Option<&str> {
        self.errors.first().map(|e| e.field.as_str())
    }

    /// `Ok(())` when empty, the collection otherwise
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Validation of a row payload.
///
/// `fields` restricts validation to the named attributes when present.
pub trait Validate {
    /// Validate the payload, returning every failure found
    fn validate(&self, fields: Option<&[&str]>) -> Result<(), ValidationErrors>;
}

impl Validate for String {
    fn validate(&self, _fields: Option<&[&str]>) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(), Ok(()));
        let errors = ValidationErrors::single("title", "cannot be blank");
        assert_eq!(errors.first_field(), Some("title"));
        assert_eq!(errors.to_string(), "title: cannot be blank");
        assert!(errors.into_result().is_err());
    }
}
