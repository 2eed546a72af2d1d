//! Resolution of a many-to-many "replace" request into concrete link writes

use serde::Deserialize;
use std::collections::BTreeSet;

/// Ids to attach to and detach from a post in one operation
///
/// Both lists are optional on the wire; a missing list means "no change in
/// that direction".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChanges {
    #[serde(default)]
    pub categories_to_add: Option<Vec<i64>>,
    #[serde(default)]
    pub categories_to_remove: Option<Vec<i64>>,
}

/// Link writes derived from a [`CategoryChanges`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    pub connect: BTreeSet<i64>,
    pub disconnect: BTreeSet<i64>,
}

impl CategoryChanges {
    pub fn new(add: impl IntoIterator<Item = i64>, remove: impl IntoIterator<Item = i64>) -> Self {
        Self {
            categories_to_add: Some(add.into_iter().collect()),
            categories_to_remove: Some(remove.into_iter().collect()),
        }
    }

    /// Resolve the request against the pre-operation state
    ///
    /// Both sets are read as of before the operation. An id present in both
    /// ends detached: `connect = add \ remove`, `disconnect = remove`.
    /// Duplicates collapse.
    pub fn plan(&self) -> LinkPlan {
        let disconnect: BTreeSet<i64> = self
            .categories_to_remove
            .iter()
            .flatten()
            .copied()
            .collect();
        let connect = self
            .categories_to_add
            .iter()
            .flatten()
            .copied()
            .filter(|id| !disconnect.contains(id))
            .collect();

        LinkPlan {
            connect,
            disconnect,
        }
    }
}

impl LinkPlan {
    pub fn is_empty(&self) -> bool {
        self.connect.is_empty() && self.disconnect.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_overlap_is_disconnected() {
        let plan = CategoryChanges::new([5], [5]).plan();
        assert!(plan.connect.is_empty());
        assert_eq!(plan.disconnect, set(&[5]));
    }

    #[test]
    fn test_partial_overlap() {
        let plan = CategoryChanges::new([3, 4], [4]).plan();
        assert_eq!(plan.connect, set(&[3]));
        assert_eq!(plan.disconnect, set(&[4]));
    }

    #[test]
    fn test_missing_lists_are_no_ops() {
        let plan = CategoryChanges::default().plan();
        assert!(plan.is_empty());

        let only_add = CategoryChanges {
            categories_to_add: Some(vec![1, 1, 2]),
            categories_to_remove: None,
        };
        assert_eq!(only_add.plan().connect, set(&[1, 2]));
        assert!(only_add.plan().disconnect.is_empty());
    }

    #[test]
    fn test_deserializes_wire_names() {
        let changes: CategoryChanges =
            serde_json::from_str(r#"{"categoriesToAdd":[3,4],"categoriesToRemove":[4]}"#).unwrap();
        assert_eq!(changes.plan().connect, set(&[3]));

        let empty: CategoryChanges = serde_json::from_str("{}").unwrap();
        assert!(empty.plan().is_empty());
    }
}
