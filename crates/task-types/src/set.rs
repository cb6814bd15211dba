//! Ordered set of task ids with a stable storage encoding.

use std::collections::{BTreeSet, btree_set};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// Set of [`TaskId`]s used for dependency edges and the batch index.
///
/// Backed by a `BTreeSet` so iteration and serialization order are
/// deterministic regardless of insertion order.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct TaskIdSet(BTreeSet<TaskId>);

impl TaskIdSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns true if the id was not already present.
    pub fn insert(&mut self, id: TaskId) -> bool {
        self.0.insert(id)
    }

    /// Returns true if the id was present.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, TaskId> {
        self.0.iter()
    }
}

impl FromIterator<TaskId> for TaskIdSet {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TaskIdSet {
    type Item = &'a TaskId;
    type IntoIter = btree_set::Iter<'a, TaskId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for TaskIdSet {
    type Item = TaskId;
    type IntoIter = btree_set::IntoIter<TaskId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let a = TaskId::random();
        let b = TaskId::random();

        let mut set = TaskIdSet::new();
        assert!(set.is_empty());
        assert!(set.insert(a));
        assert!(!set.insert(a));
        assert!(set.insert(b));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));

        assert!(set.remove(&a));
        assert!(!set.remove(&a));
        assert!(!set.contains(&a));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let lo = TaskId::new([1; 16]);
        let hi = TaskId::new([2; 16]);

        let mut set = TaskIdSet::new();
        set.insert(hi);
        set.insert(lo);

        let ids: Vec<_> = set.iter().copied().collect();
        assert_eq!(ids, vec![lo, hi]);
    }

    #[test]
    fn test_borsh_roundtrip_is_stable() {
        let mut a = TaskIdSet::new();
        a.insert(TaskId::new([9; 16]));
        a.insert(TaskId::new([3; 16]));

        // Same contents inserted in the opposite order.
        let mut b = TaskIdSet::new();
        b.insert(TaskId::new([3; 16]));
        b.insert(TaskId::new([9; 16]));

        assert_eq!(borsh::to_vec(&a).unwrap(), borsh::to_vec(&b).unwrap());
    }
}
