//! Payload fixture and storage lookups

use arbor_core::effects::TreeReadEffects;
use arbor_core::{Bounds, NodeId, NodeQuery, Titled, TreeNode, Validate, ValidationErrors};
use arbor_effects::MemoryTreeStorage;
use serde::{Deserialize, Serialize};

/// Menu-like payload with a validated title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Display title; must not be blank
    pub title: String,
    /// Visibility flag, used by filter tests
    pub active: bool,
}

impl Item {
    /// Active item
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            active: true,
        }
    }

    /// Inactive item
    pub fn inactive(title: &str) -> Self {
        Self {
            active: false,
            ..Self::new(title)
        }
    }
}

impl Titled for Item {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Validate for Item {
    fn validate(&self, fields: Option<&[&str]>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let checks_title = fields.map_or(true, |fields| fields.contains(&"title"));
        if checks_title && self.title.trim().is_empty() {
            errors.add("title", "cannot be blank");
        }
        errors.into_result()
    }
}

/// Committed row whose title is `title`
///
/// # Panics
///
/// When no row carries the title.
pub fn find_by_title<T>(storage: &MemoryTreeStorage<T>, title: &str) -> TreeNode<T>
where
    T: Titled + Clone + Send + Sync,
{
    storage
        .snapshot()
        .into_iter()
        .find(|node| node.data.title() == title)
        .unwrap_or_else(|| panic!("no row titled {title:?}"))
}

/// Committed bounds of `id`
///
/// # Panics
///
/// When the row does not exist.
pub fn bounds_of<T>(storage: &MemoryTreeStorage<T>, id: NodeId) -> Bounds
where
    T: Clone + Send + Sync,
{
    storage
        .find_one(&NodeQuery::by_id(id))
        .unwrap()
        .unwrap_or_else(|| panic!("row {id} not found"))
        .bounds
}

/// Every committed row as `(title, lft, rgt, level)`, ordered by group then `lft`
pub fn shape<T>(storage: &MemoryTreeStorage<T>) -> Vec<(String, i64, i64, u32)>
where
    T: Titled + Clone,
{
    storage
        .snapshot()
        .into_iter()
        .map(|n| (n.data.title().to_string(), n.lft(), n.rgt(), n.level()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_validation_respects_fields() {
        let blank = Item::new(" ");
        assert!(blank.validate(None).is_err());
        assert!(blank.validate(Some(&["title"])).is_err());
        assert!(blank.validate(Some(&["active"])).is_ok());
        assert!(Item::inactive("x").validate(None).is_ok());
    }
}
