//! Error Types
//!
//! [`TreeError`] is the single failure type of every tree operation. The
//! user-correctable taxonomy (descriptor format, action, target, legality,
//! invalid moves, validation) is reported as structured values attached to a
//! field; storage failures and post-mutation corruption are kept distinct so
//! callers can tell "fix your input" from "the backend failed".

use crate::boundary::BoundaryError;
use crate::invariants::InvariantViolation;
use crate::types::NodeId;
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Field that position-directive failures attach to
pub const POSITION_FIELD: &str = "position";

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Record lifecycle state, used in legality failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Not yet persisted
    New,
    /// Already persisted
    Existing,
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordState::New => write!(f, "new record"),
            RecordState::Existing => write!(f, "existing record"),
        }
    }
}

/// Storage collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    /// Backend-level failure (connectivity, I/O, injected faults)
    #[error("storage backend failure: {reason}")]
    Backend {
        /// Backend message
        reason: String,
    },

    /// Update or delete addressed a row that does not exist
    #[error("row {id} not found")]
    RowNotFound {
        /// Identity that did not resolve
        id: NodeId,
    },
}

impl StorageError {
    /// Create a backend error
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Failure of a tree operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// Position descriptor is not valid structured data
    #[error("invalid position format: {reason}")]
    Format {
        /// Decoder message
        reason: String,
    },

    /// Position descriptor has no action
    #[error("position descriptor has no action")]
    MissingAction,

    /// Action name not recognized
    #[error("invalid action: {action}")]
    InvalidAction {
        /// Action as supplied
        action: String,
    },

    /// Action requires a target but none was supplied
    #[error("action {action} requires a target")]
    MissingTarget {
        /// Action that needs the target
        action: String,
    },

    /// Target identity does not resolve to a row
    #[error("requested target {target} not found")]
    TargetNotFound {
        /// Requested target
        target: NodeId,
    },

    /// Action is illegal for the record's lifecycle state
    #[error("requested action {action} not available for {state}")]
    ActionNotAllowed {
        /// Requested action
        action: String,
        /// State of the record the action was requested for
        state: RecordState,
    },

    /// Move onto the node itself or into its own subtree
    #[error("invalid move: {reason}")]
    InvalidMove {
        /// Which guard rejected the move
        reason: String,
    },

    /// Other structural precondition failed
    #[error("invalid position: {reason}")]
    InvalidPosition {
        /// Which precondition failed
        reason: String,
    },

    /// Payload validation failed
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Post-mutation verification failed; the transaction was rolled back
    #[error("tree invariant violated: {0}")]
    Corrupted(InvariantViolation),

    /// Storage failure; the transaction was rolled back
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TreeError {
    /// Create a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Create an invalid action error
    pub fn invalid_action(action: impl Into<String>) -> Self {
        Self::InvalidAction {
            action: action.into(),
        }
    }

    /// Create a missing target error
    pub fn missing_target(action: impl Into<String>) -> Self {
        Self::MissingTarget {
            action: action.into(),
        }
    }

    /// Create an action-not-allowed error
    pub fn action_not_allowed(action: impl Into<String>, state: RecordState) -> Self {
        Self::ActionNotAllowed {
            action: action.into(),
            state,
        }
    }

    /// Create an invalid move error
    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            reason: reason.into(),
        }
    }

    /// Create an invalid position error
    pub fn invalid_position(reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            reason: reason.into(),
        }
    }

    /// Field the failure attaches to
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(errors) => errors.first_field(),
            Self::Corrupted(_) | Self::Storage(_) => None,
            _ => Some(POSITION_FIELD),
        }
    }

    /// Whether the caller can fix the failure by changing its input
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Corrupted(_) | Self::Storage(_))
    }
}

impl From<BoundaryError> for TreeError {
    fn from(err: BoundaryError) -> Self {
        if err.is_self_containment() {
            Self::invalid_move(err.to_string())
        } else {
            Self::invalid_position(err.to_string())
        }
    }
}

impl From<ValidationErrors> for TreeError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<InvariantViolation> for TreeError {
    fn from(violation: InvariantViolation) -> Self {
        Self::Corrupted(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_errors_split_by_kind() {
        assert!(matches!(
            TreeError::from(BoundaryError::IntoOwnSubtree),
            TreeError::InvalidMove { .. }
        ));
        assert!(matches!(
            TreeError::from(BoundaryError::OntoSelf),
            TreeError::InvalidMove { .. }
        ));
        assert!(matches!(
            TreeError::from(BoundaryError::SiblingOfRoot),
            TreeError::InvalidPosition { .. }
        ));
    }

    #[test]
    fn test_field_attachment() {
        assert_eq!(TreeError::MissingAction.field(), Some(POSITION_FIELD));
        let validation = TreeError::from(ValidationErrors::single("title", "blank"));
        assert_eq!(validation.field(), Some("title"));
        assert_eq!(TreeError::from(StorageError::backend("down")).field(), None);
    }

    #[test]
    fn test_user_error_classification() {
        assert!(TreeError::invalid_action("jump").is_user_error());
        assert!(!TreeError::from(StorageError::backend("down")).is_user_error());
    }

    #[test]
    fn test_messages() {
        let err = TreeError::action_not_allowed("appendTo", RecordState::Existing);
        assert_eq!(
            err.to_string(),
            "requested action appendTo not available for existing record"
        );
        assert_eq!(
            TreeError::TargetNotFound { target: NodeId(5) }.to_string(),
            "requested target 5 not found"
        );
    }
}
