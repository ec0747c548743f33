//! Position directives
//!
//! A position directive is the declarative form of a tree operation: an
//! action name plus an optional target identity, supplied either as JSON text
//! or as an already decoded JSON value, in object (`{"action": .., "target": ..}`)
//! or positional (`[action, target]`) shape.
//!
//! [`PositionDirective::save`] resolves the directive against a record and
//! dispatches it to the matching [`NestedSet`] operation, enforcing the
//! legality table: new records may only be inserted, existing records may only
//! be moved. Every failure attaches to the `position` field.

use crate::nested_set::NestedSet;
use arbor_core::effects::TreeStorageEffects;
use arbor_core::{NodeId, RecordState, Result, TreeError, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Discriminant of an [`Action`], spelled as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Insert as the root of a new tree
    CreateRoot,
    /// Insert as the first child of the target
    PrependTo,
    /// Insert as the last child of the target
    AppendTo,
    /// Insert as the sibling before the target
    InsertBefore,
    /// Insert as the sibling after the target
    InsertAfter,
    /// Move to the sibling slot before the target
    MoveBefore,
    /// Move to the sibling slot after the target
    MoveAfter,
    /// Move to the first child slot of the target
    MoveAsFirst,
    /// Move to the last child slot of the target
    MoveAsLast,
    /// Move into a new tree as its root
    MoveAsRoot,
}

impl ActionKind {
    /// Every action, creation actions first
    pub const ALL: [ActionKind; 10] = [
        ActionKind::CreateRoot,
        ActionKind::PrependTo,
        ActionKind::AppendTo,
        ActionKind::InsertBefore,
        ActionKind::InsertAfter,
        ActionKind::MoveBefore,
        ActionKind::MoveAfter,
        ActionKind::MoveAsFirst,
        ActionKind::MoveAsLast,
        ActionKind::MoveAsRoot,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CreateRoot => "createRoot",
            ActionKind::PrependTo => "prependTo",
            ActionKind::AppendTo => "appendTo",
            ActionKind::InsertBefore => "insertBefore",
            ActionKind::InsertAfter => "insertAfter",
            ActionKind::MoveBefore => "moveBefore",
            ActionKind::MoveAfter => "moveAfter",
            ActionKind::MoveAsFirst => "moveAsFirst",
            ActionKind::MoveAsLast => "moveAsLast",
            ActionKind::MoveAsRoot => "moveAsRoot",
        }
    }

    /// Whether the action is placed relative to a target node
    pub fn requires_target(self) -> bool {
        !matches!(self, ActionKind::CreateRoot | ActionKind::MoveAsRoot)
    }

    /// Whether the action creates the record
    pub fn is_creation(self) -> bool {
        matches!(
            self,
            ActionKind::CreateRoot
                | ActionKind::PrependTo
                | ActionKind::AppendTo
                | ActionKind::InsertBefore
                | ActionKind::InsertAfter
        )
    }

    /// Whether the action may be applied to a record in the given state
    pub fn is_legal(self, is_new_record: bool) -> bool {
        self.is_creation() == is_new_record
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = TreeError;

    fn from_str(name: &str) -> Result<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| TreeError::invalid_action(name))
    }
}

/// A tree operation with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Action {
    CreateRoot,
    PrependTo(NodeId),
    AppendTo(NodeId),
    InsertBefore(NodeId),
    InsertAfter(NodeId),
    MoveBefore(NodeId),
    MoveAfter(NodeId),
    MoveAsFirst(NodeId),
    MoveAsLast(NodeId),
    MoveAsRoot,
}

impl Action {
    /// Build an action, requiring a non-zero target where the kind needs one
    pub fn new(kind: ActionKind, target: Option<NodeId>) -> Result<Self> {
        let target = target.filter(|id| !id.is_none());
        let targeted = |build: fn(NodeId) -> Action| {
            target
                .map(build)
                .ok_or_else(|| TreeError::missing_target(kind.as_str()))
        };
        match kind {
            ActionKind::CreateRoot => Ok(Action::CreateRoot),
            ActionKind::MoveAsRoot => Ok(Action::MoveAsRoot),
            ActionKind::PrependTo => targeted(Action::PrependTo),
            ActionKind::AppendTo => targeted(Action::AppendTo),
            ActionKind::InsertBefore => targeted(Action::InsertBefore),
            ActionKind::InsertAfter => targeted(Action::InsertAfter),
            ActionKind::MoveBefore => targeted(Action::MoveBefore),
            ActionKind::MoveAfter => targeted(Action::MoveAfter),
            ActionKind::MoveAsFirst => targeted(Action::MoveAsFirst),
            ActionKind::MoveAsLast => targeted(Action::MoveAsLast),
        }
    }

    /// Discriminant
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateRoot => ActionKind::CreateRoot,
            Action::PrependTo(_) => ActionKind::PrependTo,
            Action::AppendTo(_) => ActionKind::AppendTo,
            Action::InsertBefore(_) => ActionKind::InsertBefore,
            Action::InsertAfter(_) => ActionKind::InsertAfter,
            Action::MoveBefore(_) => ActionKind::MoveBefore,
            Action::MoveAfter(_) => ActionKind::MoveAfter,
            Action::MoveAsFirst(_) => ActionKind::MoveAsFirst,
            Action::MoveAsLast(_) => ActionKind::MoveAsLast,
            Action::MoveAsRoot => ActionKind::MoveAsRoot,
        }
    }

    /// Target node, if the action has one
    pub fn target(&self) -> Option<NodeId> {
        match *self {
            Action::CreateRoot | Action::MoveAsRoot => None,
            Action::PrependTo(id)
            | Action::AppendTo(id)
            | Action::InsertBefore(id)
            | Action::InsertAfter(id)
            | Action::MoveBefore(id)
            | Action::MoveAfter(id)
            | Action::MoveAsFirst(id)
            | Action::MoveAsLast(id) => Some(id),
        }
    }

    /// Whether the action may be applied to a record in the given state
    pub fn is_legal(&self, is_new_record: bool) -> bool {
        self.kind().is_legal(is_new_record)
    }
}

/// Raw position input
#[derive(Debug, Clone, PartialEq)]
pub enum PositionInput {
    /// JSON text, decoded on use
    Text(String),
    /// Already decoded JSON
    Structured(Value),
}

impl From<&str> for PositionInput {
    fn from(text: &str) -> Self {
        PositionInput::Text(text.to_string())
    }
}

impl From<String> for PositionInput {
    fn from(text: String) -> Self {
        PositionInput::Text(text)
    }
}

impl From<Value> for PositionInput {
    fn from(value: Value) -> Self {
        PositionInput::Structured(value)
    }
}

/// Action slot of a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedAction {
    /// No action key or element
    Absent,
    /// Action present but null or empty
    Blank,
    /// Action name as supplied
    Named(String),
}

/// Decoded but not yet resolved directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionDescriptor {
    /// Requested action
    pub action: RequestedAction,
    /// Target identity; [`NodeId::NONE`] when absent or not a positive integer
    pub target: NodeId,
}

impl PositionDescriptor {
    /// Decode a descriptor from raw input
    pub fn parse(input: &PositionInput) -> Result<Self> {
        match input {
            PositionInput::Text(text) => {
                let value: Value = serde_json::from_str(text)
                    .map_err(|err| TreeError::format(err.to_string()))?;
                Self::from_value(&value)
            }
            PositionInput::Structured(value) => Self::from_value(value),
        }
    }

    /// Decode a descriptor from a JSON object or array
    pub fn from_value(value: &Value) -> Result<Self> {
        let (action, target) = match value {
            Value::Object(map) => (
                map.get("action").or_else(|| map.get("0")),
                map.get("target").or_else(|| map.get("1")),
            ),
            Value::Array(items) => (items.first(), items.get(1)),
            other => {
                return Err(TreeError::format(format!(
                    "expected an object or an array, got {}",
                    json_kind(other)
                )))
            }
        };

        let action = match action {
            None => RequestedAction::Absent,
            Some(Value::Null) | Some(Value::Bool(false)) => RequestedAction::Blank,
            Some(Value::String(name)) if name.is_empty() => RequestedAction::Blank,
            Some(Value::String(name)) => RequestedAction::Named(name.clone()),
            Some(other) => RequestedAction::Named(other.to_string()),
        };

        Ok(Self {
            action,
            target: target.map_or(NodeId::NONE, coerce_target),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Integer coercion of a target value; anything non-positive becomes zero
fn coerce_target(value: &Value) -> NodeId {
    let id = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 1.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    NodeId(id.unwrap_or(0))
}

/// What a directive did to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Payload persisted without a structural change
    Saved(NodeId),
    /// Structural action applied
    Applied {
        /// Applied action
        action: Action,
        /// Identity of the record afterwards
        node: NodeId,
    },
}

impl SaveOutcome {
    /// Identity of the record afterwards
    pub fn node(&self) -> NodeId {
        match self {
            SaveOutcome::Saved(node) | SaveOutcome::Applied { node, .. } => *node,
        }
    }
}

/// Resolved position directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDirective {
    /// Save the payload only
    SaveOnly,
    /// Perform a structural action
    Perform(Action),
}

impl PositionDirective {
    /// Resolve raw input into a directive
    ///
    /// Checks run in order: format, missing action, blank action (save only),
    /// unknown action, missing target.
    pub fn resolve(input: Option<&PositionInput>) -> Result<Self> {
        let Some(input) = input else {
            return Ok(PositionDirective::SaveOnly);
        };
        let descriptor = PositionDescriptor::parse(input)?;
        let name = match descriptor.action {
            RequestedAction::Absent => return Err(TreeError::MissingAction),
            RequestedAction::Blank => return Ok(PositionDirective::SaveOnly),
            RequestedAction::Named(name) => name,
        };
        let kind: ActionKind = name.parse()?;
        Ok(PositionDirective::Perform(Action::new(
            kind,
            Some(descriptor.target),
        )?))
    }

    /// Resolve `input` and apply it to `record`
    pub fn save<T, S>(
        record: &mut NestedSet<'_, '_, T, S>,
        input: Option<&PositionInput>,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<SaveOutcome>
    where
        T: Clone + Send + Sync + Validate,
        S: TreeStorageEffects<T>,
    {
        Self::resolve(input)?.apply(record, validate, fields)
    }

    /// Apply the directive to `record`
    pub fn apply<T, S>(
        self,
        record: &mut NestedSet<'_, '_, T, S>,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<SaveOutcome>
    where
        T: Clone + Send + Sync + Validate,
        S: TreeStorageEffects<T>,
    {
        let action = match self {
            PositionDirective::SaveOnly => {
                return record.save_node(validate, fields).map(SaveOutcome::Saved)
            }
            PositionDirective::Perform(action) => action,
        };

        if let Some(target) = action.target() {
            if record.engine().find(target)?.is_none() {
                return Err(TreeError::TargetNotFound { target });
            }
        }

        let is_new = record.is_new();
        if !action.is_legal(is_new) {
            let state = if is_new {
                RecordState::New
            } else {
                RecordState::Existing
            };
            return Err(TreeError::action_not_allowed(action.kind().as_str(), state));
        }
        debug!(action = %action.kind(), target = ?action.target(), "position directive resolved");

        let node = match action {
            Action::CreateRoot => record.create_root(validate, fields)?,
            Action::PrependTo(target) => record.prepend_to(target, validate, fields)?,
            Action::AppendTo(target) => record.append_to(target, validate, fields)?,
            Action::InsertBefore(target) => record.insert_before(target, validate, fields)?,
            Action::InsertAfter(target) => record.insert_after(target, validate, fields)?,
            Action::MoveBefore(target) => {
                let node = record.save_node(validate, fields)?;
                record.move_before(target)?;
                node
            }
            Action::MoveAfter(target) => {
                let node = record.save_node(validate, fields)?;
                record.move_after(target)?;
                node
            }
            Action::MoveAsFirst(target) => {
                let node = record.save_node(validate, fields)?;
                record.move_as_first(target)?;
                node
            }
            Action::MoveAsLast(target) => {
                let node = record.save_node(validate, fields)?;
                record.move_as_last(target)?;
                node
            }
            Action::MoveAsRoot => {
                let node = record.save_node(validate, fields)?;
                record.move_as_root()?;
                node
            }
        };

        Ok(SaveOutcome::Applied { action, node })
    }
}
