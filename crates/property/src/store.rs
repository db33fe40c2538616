//! Deferred snapshot storage.

/// The constrained value snapshot behind a property.
///
/// Successful runs *store* candidate data; the snapshot only becomes
/// observable when the whole property settles valid and the machine
/// *applies* it. The snapshot is an independently owned value, never an
/// alias of the live value.
pub(crate) trait DeferredValue<T> {
    /// Records data from a successfully validated value.
    fn store(&mut self, value: &T);

    /// Makes the stored data observable. Returns whether the observable
    /// snapshot actually changed.
    fn apply(&mut self) -> bool;

    /// The currently observable snapshot.
    fn value(&self) -> &T;
}

/// Snapshot store for scalar properties: the whole value is replaced on
/// commit.
pub(crate) struct ScalarStore<T> {
    current: T,
    pending: Option<T>,
}

impl<T> ScalarStore<T> {
    pub fn new(initial: T) -> Self {
        Self { current: initial, pending: None }
    }
}

impl<T: Clone + PartialEq> DeferredValue<T> for ScalarStore<T> {
    fn store(&mut self, value: &T) {
        self.pending = Some(value.clone());
    }

    fn apply(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) if pending != self.current => {
                self.current = pending;
                true
            }
            _ => false,
        }
    }

    fn value(&self) -> &T {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{DeferredValue, ScalarStore};

    #[test]
    fn apply_commits_the_latest_stored_value_once() {
        let mut store = ScalarStore::new(0);
        store.store(&1);
        store.store(&2);

        assert!(store.apply());
        assert_eq!(*store.value(), 2);
        // nothing pending, nothing changes
        assert!(!store.apply());
    }

    #[test]
    fn storing_an_equal_value_does_not_count_as_a_change() {
        let mut store = ScalarStore::new(7);
        store.store(&7);
        assert!(!store.apply());
    }
}
