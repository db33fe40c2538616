//! Map change aggregation.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

/// The merged form of any number of map mutations: keys to remove and
/// entries to insert. Removals are applied before insertions, so a key
/// that was removed and later re-added ends up with its newest value.
#[derive(Debug, Clone)]
pub(crate) struct MapChange<K, V> {
    pub removed: IndexSet<K>,
    pub added: IndexMap<K, V>,
}

impl<K, V> MapChange<K, V> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// Applies the change to `target`.
    pub fn apply_to(&self, target: &mut IndexMap<K, V>)
    where
        K: Hash + Eq + Clone,
        V: Clone,
    {
        for key in &self.removed {
            target.shift_remove(key);
        }
        for (key, value) in &self.added {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Merges map mutations into a single [`MapChange`].
///
/// An entry that is added and later removed within one run cancels out
/// of the additions; re-adding a removed key moves it back to the
/// additions with the new value. Removals of keys absent from the base
/// are harmless no-ops on apply.
#[derive(Debug)]
pub(crate) struct MapChangeAggregator<K, V> {
    removed: IndexSet<K>,
    added: IndexMap<K, V>,
}

impl<K, V> Default for MapChangeAggregator<K, V> {
    fn default() -> Self {
        Self { removed: IndexSet::new(), added: IndexMap::new() }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> MapChangeAggregator<K, V> {
    pub fn add_added(&mut self, key: K, value: V) {
        self.removed.shift_remove(&key);
        self.added.insert(key, value);
    }

    pub fn add_removed(&mut self, key: K) {
        self.added.shift_remove(&key);
        self.removed.insert(key);
    }

    /// Finishes the run and resets the aggregator.
    pub fn complete(&mut self) -> MapChange<K, V> {
        MapChange {
            removed: std::mem::take(&mut self.removed),
            added: std::mem::take(&mut self.added),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::{IndexMap, IndexSet, indexmap, indexset};
    use pretty_assertions::assert_eq;

    use super::MapChangeAggregator;

    #[test]
    fn merges_adds_and_deduplicates() {
        let mut aggregator = MapChangeAggregator::default();
        aggregator.add_added(0, "foo");
        aggregator.add_added(0, "foo");
        aggregator.add_added(1, "bar");

        let change = aggregator.complete();
        assert_eq!(change.added, indexmap! { 0 => "foo", 1 => "bar" });
        assert_eq!(change.removed, IndexSet::new());
    }

    #[test]
    fn merges_removes_and_deduplicates() {
        let mut aggregator: MapChangeAggregator<i32, &str> = MapChangeAggregator::default();
        aggregator.add_removed(0);
        aggregator.add_removed(0);
        aggregator.add_removed(1);

        let change = aggregator.complete();
        assert_eq!(change.added, IndexMap::<i32, &str>::new());
        assert_eq!(change.removed, indexset! { 0, 1 });
    }

    #[test]
    fn add_then_remove_cancels_the_addition() {
        let mut aggregator = MapChangeAggregator::default();
        aggregator.add_added(0, "foo");
        aggregator.add_added(1, "bar");
        aggregator.add_removed(0);

        let change = aggregator.complete();
        assert_eq!(change.added, indexmap! { 1 => "bar" });
        // The removal stays recorded; removing a key the base never had
        // is a no-op on apply.
        assert_eq!(change.removed, indexset! { 0 });

        let mut base = IndexMap::new();
        change.apply_to(&mut base);
        assert_eq!(base, indexmap! { 1 => "bar" });
    }

    #[test]
    fn remove_then_add_keeps_the_newest_value() {
        let mut aggregator = MapChangeAggregator::default();
        aggregator.add_removed(0);
        aggregator.add_added(1, "bar");
        aggregator.add_added(0, "foo");

        let change = aggregator.complete();
        assert_eq!(change.added, indexmap! { 1 => "bar", 0 => "foo" });
        assert_eq!(change.removed, IndexSet::new());

        let mut base = indexmap! { 0 => "old" };
        change.apply_to(&mut base);
        assert_eq!(base, indexmap! { 0 => "foo", 1 => "bar" });
    }

    #[test]
    fn complete_resets_the_run() {
        let mut aggregator = MapChangeAggregator::default();
        aggregator.add_added(0, "foo");
        let first = aggregator.complete();
        assert!(!first.is_empty());
        assert!(aggregator.complete().is_empty());
    }
}
