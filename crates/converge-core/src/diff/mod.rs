//! Key/value diff
//!
//! [`diff`] compares a current and a desired mapping and partitions the keys
//! that differ into `added`, `deleted` and `modified`. The three sets are
//! pairwise disjoint; keys whose value is the same on both sides appear in
//! none of them.
//!
//! ```rust
//! use converge_core::diff::diff;
//! use std::collections::BTreeMap;
//!
//! let current = BTreeMap::from([("A", "1"), ("B", "2")]);
//! let desired = BTreeMap::from([("B", "2"), ("C", "3")]);
//!
//! let changes = diff(&current, &desired);
//! assert!(changes.added.contains("C"));
//! assert!(changes.deleted.contains("A"));
//! assert!(changes.modified.is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet};

/// Partition of the keys that differ between two mappings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueDiff<K: Ord> {
    /// Keys present in desired but absent in current
    pub added: BTreeSet<K>,
    /// Keys present in current but absent in desired
    pub deleted: BTreeSet<K>,
    /// Keys present in both with different values
    pub modified: BTreeSet<K>,
}

impl<K: Ord> KeyValueDiff<K> {
    /// True if both mappings are identical
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    /// Number of keys that differ
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }

    /// Keys whose desired value must be written (`added ∪ modified`)
    pub fn upserts(&self) -> impl Iterator<Item = &K> {
        self.added.iter().chain(self.modified.iter())
    }
}

impl<K: Ord> Default for KeyValueDiff<K> {
    fn default() -> Self {
        Self {
            added: BTreeSet::new(),
            deleted: BTreeSet::new(),
            modified: BTreeSet::new(),
        }
    }
}

/// Compute the diff that takes `current` to `desired`
///
/// Runs in a single pass over each side and holds no state, so equal inputs
/// always give equal outputs.
pub fn diff<K, V>(current: &BTreeMap<K, V>, desired: &BTreeMap<K, V>) -> KeyValueDiff<K>
where
    K: Ord + Clone,
    V: PartialEq,
{
    let mut result = KeyValueDiff::default();

    for (key, value) in current {
        match desired.get(key) {
            None => {
                result.deleted.insert(key.clone());
            }
            Some(desired_value) if desired_value != value => {
                result.modified.insert(key.clone());
            }
            Some(_) => {}
        }
    }

    for key in desired.keys() {
        if !current.contains_key(key) {
            result.added.insert(key.clone());
        }
    }

    result
}
