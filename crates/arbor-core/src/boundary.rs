//! Boundary Codec
//!
//! Pure arithmetic over nested-set boundaries. Every structural mutation is
//! expressed as a plan that maps a row's *pre-operation* [`Bounds`] to its
//! post-operation state:
//!
//! - [`InsertPlan`]: open a gap of [`LEAF_WIDTH`] at the insertion key and
//!   place a fresh leaf in it
//! - [`MovePlan`]: close the gap left by a subtree and reopen it at the
//!   destination, translating the subtree (same group, across groups, or into
//!   a new root group)
//! - [`DeletePlan`]: drop a subtree and close its gap
//!
//! Plans never perform I/O. Callers read the affected groups, run
//! [`BoundaryPlan::remap`] over every row exactly once, and write back the
//! rows reported as [`Remap::Moved`] or [`Remap::Removed`]. Re-applying a plan
//! to already remapped bounds is not supported.

use crate::types::{Bounds, GroupId};
use serde::{Deserialize, Serialize};

/// Width of a freshly created leaf interval
pub const LEAF_WIDTH: i64 = 2;

/// Position of a node relative to a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    /// First child of the target
    FirstChild,
    /// Last child of the target
    LastChild,
    /// Immediately preceding sibling of the target
    Before,
    /// Immediately following sibling of the target
    After,
}

impl Placement {
    /// Boundary value at which the gap opens
    pub fn key(self, target: &Bounds) -> i64 {
        match self {
            Placement::FirstChild => target.lft + 1,
            Placement::LastChild => target.rgt,
            Placement::Before => target.lft,
            Placement::After => target.rgt + 1,
        }
    }

    /// Depth of the placed node relative to the target
    pub fn level_offset(self) -> u32 {
        match self {
            Placement::FirstChild | Placement::LastChild => 1,
            Placement::Before | Placement::After => 0,
        }
    }

    /// Whether the placed node becomes a sibling of the target
    pub fn is_sibling(self) -> bool {
        self.level_offset() == 0
    }
}

/// Structural guard failures detected while planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoundaryError {
    /// Target and subject are the same node
    #[error("the target node should not be the node itself")]
    OntoSelf,

    /// Target lies inside the subject's subtree
    #[error("the target node should not be a descendant of the node")]
    IntoOwnSubtree,

    /// Sibling placement against a root
    #[error("the target node should not be a root")]
    SiblingOfRoot,

    /// Subject is already the root of its group
    #[error("the node already is a root")]
    AlreadyRoot,
}

impl BoundaryError {
    /// Whether the failure is a move into the node's own subtree (or onto itself)
    pub fn is_self_containment(&self) -> bool {
        matches!(self, Self::OntoSelf | Self::IntoOwnSubtree)
    }
}

/// Outcome of remapping one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remap {
    /// Row keeps its bounds
    Unchanged,
    /// Row takes new bounds
    Moved(Bounds),
    /// Row is deleted
    Removed,
}

/// A computed boundary mutation.
pub trait BoundaryPlan {
    /// Post-operation state of a row given its pre-operation bounds
    fn remap(&self, bounds: &Bounds) -> Remap;

    /// Groups whose rows the plan may touch
    fn groups(&self) -> Vec<GroupId>;
}

/// Shift every boundary value `>= at` by `width`.
pub fn open_gap(bounds: &Bounds, at: i64, width: i64) -> Bounds {
    let mut shifted = *bounds;
    if shifted.lft >= at {
        shifted.lft += width;
    }
    if shifted.rgt >= at {
        shifted.rgt += width;
    }
    shifted
}

/// Shift every boundary value `> after` back by `width`.
pub fn close_gap(bounds: &Bounds, after: i64, width: i64) -> Bounds {
    let mut shifted = *bounds;
    if shifted.lft > after {
        shifted.lft -= width;
    }
    if shifted.rgt > after {
        shifted.rgt -= width;
    }
    shifted
}

fn shift_level(level: u32, delta: i64) -> u32 {
    u32::try_from(i64::from(level) + delta).unwrap_or(1)
}

fn remap_if_changed(before: &Bounds, after: Bounds) -> Remap {
    if *before == after {
        Remap::Unchanged
    } else {
        Remap::Moved(after)
    }
}

/// Insertion of a new leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPlan {
    node: Bounds,
    shifts_group: bool,
}

impl InsertPlan {
    /// Plan a leaf placed relative to `target`
    pub fn relative_to(target: &Bounds, placement: Placement) -> Result<Self, BoundaryError> {
        if placement.is_sibling() && target.is_root() {
            return Err(BoundaryError::SiblingOfRoot);
        }
        let key = placement.key(target);
        Ok(Self {
            node: Bounds {
                lft: key,
                rgt: key + 1,
                level: target.level + placement.level_offset(),
                root: target.root,
            },
            shifts_group: true,
        })
    }

    /// Plan a childless root in an empty group
    pub fn root(group: GroupId) -> Self {
        Self {
            node: Bounds::new_root(group),
            shifts_group: false,
        }
    }

    /// Bounds of the inserted node
    pub fn node(&self) -> Bounds {
        self.node
    }
}

impl BoundaryPlan for InsertPlan {
    fn remap(&self, bounds: &Bounds) -> Remap {
        if !self.shifts_group || bounds.root != self.node.root {
            return Remap::Unchanged;
        }
        remap_if_changed(bounds, open_gap(bounds, self.node.lft, LEAF_WIDTH))
    }

    fn groups(&self) -> Vec<GroupId> {
        vec![self.node.root]
    }
}

/// Relocation of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    subject: Bounds,
    translation: i64,
    level_delta: i64,
    destination: GroupId,
    reopen_at: Option<i64>,
}

impl MovePlan {
    /// Plan moving `subject` with its subtree relative to `target`
    pub fn relative_to(
        subject: &Bounds,
        target: &Bounds,
        placement: Placement,
    ) -> Result<Self, BoundaryError> {
        if subject == target {
            return Err(BoundaryError::OntoSelf);
        }
        if subject.strictly_contains(target) {
            return Err(BoundaryError::IntoOwnSubtree);
        }
        if placement.is_sibling() && target.is_root() {
            return Err(BoundaryError::SiblingOfRoot);
        }

        let width = subject.width();
        let key = placement.key(target);
        let level_delta =
            i64::from(target.level) + i64::from(placement.level_offset()) - i64::from(subject.level);

        // Within one group the key is re-expressed after the subtree's gap closes.
        // It can never fall inside (subject.lft, subject.rgt] here.
        let reopen_at = if target.root == subject.root && key > subject.rgt {
            key - width
        } else {
            key
        };

        Ok(Self {
            subject: *subject,
            translation: reopen_at - subject.lft,
            level_delta,
            destination: target.root,
            reopen_at: Some(reopen_at),
        })
    }

    /// Plan moving `subject` with its subtree into the new group `group`
    pub fn to_root(subject: &Bounds, group: GroupId) -> Result<Self, BoundaryError> {
        if subject.is_root() {
            return Err(BoundaryError::AlreadyRoot);
        }
        Ok(Self {
            subject: *subject,
            translation: 1 - subject.lft,
            level_delta: 1 - i64::from(subject.level),
            destination: group,
            reopen_at: None,
        })
    }

    /// Width of the relocated interval
    pub fn width(&self) -> i64 {
        self.subject.width()
    }

    /// Whether applying the plan changes nothing
    pub fn is_noop(&self) -> bool {
        self.destination == self.subject.root && self.translation == 0 && self.level_delta == 0
    }

    /// Bounds the subject takes after the move
    pub fn subject_after(&self) -> Bounds {
        self.translate(&self.subject)
    }

    fn translate(&self, bounds: &Bounds) -> Bounds {
        Bounds {
            lft: bounds.lft + self.translation,
            rgt: bounds.rgt + self.translation,
            level: shift_level(bounds.level, self.level_delta),
            root: self.destination,
        }
    }
}

impl BoundaryPlan for MovePlan {
    fn remap(&self, bounds: &Bounds) -> Remap {
        let width = self.width();
        if self.subject.encloses(bounds) {
            return remap_if_changed(bounds, self.translate(bounds));
        }

        let mut after = *bounds;
        if bounds.root == self.subject.root {
            after = close_gap(&after, self.subject.rgt, width);
        }
        if bounds.root == self.destination {
            if let Some(key) = self.reopen_at {
                after = open_gap(&after, key, width);
            }
        }
        remap_if_changed(bounds, after)
    }

    fn groups(&self) -> Vec<GroupId> {
        if self.destination == self.subject.root {
            vec![self.subject.root]
        } else {
            vec![self.subject.root, self.destination]
        }
    }
}

/// Removal of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePlan {
    subject: Bounds,
}

impl DeletePlan {
    /// Plan deleting `subject` with its subtree
    pub fn of(subject: &Bounds) -> Self {
        Self { subject: *subject }
    }

    /// Number of rows the plan removes
    pub fn removed_rows(&self) -> i64 {
        self.subject.descendant_count() + 1
    }
}

impl BoundaryPlan for DeletePlan {
    fn remap(&self, bounds: &Bounds) -> Remap {
        if self.subject.encloses(bounds) {
            return Remap::Removed;
        }
        if bounds.root != self.subject.root {
            return Remap::Unchanged;
        }
        remap_if_changed(
            bounds,
            close_gap(bounds, self.subject.rgt, self.subject.width()),
        )
    }

    fn groups(&self) -> Vec<GroupId> {
        vec![self.subject.root]
    }
}
