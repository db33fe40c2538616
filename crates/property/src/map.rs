//! Map constrained property.

use std::hash::Hash;

use indexmap::IndexMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use veris_constraint::Diagnostic;

use crate::SharedConstraint;
use crate::change::MapChangeAggregator;
use crate::diagnostics::DiagnosticList;
use crate::element::ConstrainedElement;
use crate::machine::Machine;
use crate::pump::{Completion, CompletionTarget};
use crate::state::{ChangeKind, ListenerId, ValidationState};
use crate::store::DeferredValue;

/// Snapshot store for map properties: removed keys and added entries
/// recorded since the last commit merge into one change, applied to the
/// snapshot when the property settles valid.
struct MapStore<K, V> {
    snapshot: IndexMap<K, V>,
    aggregator: MapChangeAggregator<K, V>,
}

impl<K: Hash + Eq + Clone, V: Clone> MapStore<K, V> {
    fn record_added(&mut self, key: K, value: V) {
        self.aggregator.add_added(key, value);
    }

    fn record_removed(&mut self, key: K) {
        self.aggregator.add_removed(key);
    }
}

impl<K: Hash + Eq + Clone, V: Clone> DeferredValue<IndexMap<K, V>> for MapStore<K, V> {
    fn store(&mut self, _value: &IndexMap<K, V>) {
        // The snapshot advances through recorded changes only.
    }

    fn apply(&mut self) -> bool {
        let change = self.aggregator.complete();
        if change.is_empty() {
            return false;
        }
        change.apply_to(&mut self.snapshot);
        true
    }

    fn value(&self) -> &IndexMap<K, V> {
        &self.snapshot
    }
}

/// An observable `IndexMap<K, V>` with attached constraints.
///
/// *Map constraints* validate the map as a whole on every mutation;
/// *value constraints* validate each entry's value independently
/// through a keyed [`ConstrainedElement`] record. The property is valid
/// only when the map constraints and every element record are valid.
///
/// Element records mirror the entries one to one. Constructing with an
/// asserted known state takes the initial entries on faith: their
/// records start settled valid without running.
pub struct ConstrainedMapProperty<K, V, D = Diagnostic> {
    entries: IndexMap<K, V>,
    machine: Machine<IndexMap<K, V>, D, MapStore<K, V>>,
    value_constraints: Vec<SharedConstraint<V, D>>,
    elements: IndexMap<K, ConstrainedElement<V, D>>,
    next_element: u64,
    rx: UnboundedReceiver<Completion<D>>,
    tx: UnboundedSender<Completion<D>>,
}

impl<K, V, D> ConstrainedMapProperty<K, V, D>
where
    K: Hash + Eq + Clone,
    V: Clone,
    D: Send + 'static,
{
    /// A property in the `Unknown` state; all initial entries are
    /// validated immediately.
    pub fn new(
        initial: IndexMap<K, V>,
        map_constraints: Vec<SharedConstraint<IndexMap<K, V>, D>>,
        value_constraints: Vec<SharedConstraint<V, D>>,
    ) -> Self {
        Self::with_state(
            initial,
            ValidationState::Unknown,
            map_constraints,
            value_constraints,
        )
    }

    /// A property whose initial validation state is asserted by the
    /// caller. With `Valid` the snapshot starts as a copy of the
    /// entries; otherwise it starts empty and fills on the first commit.
    pub fn with_state(
        initial: IndexMap<K, V>,
        state: ValidationState,
        map_constraints: Vec<SharedConstraint<IndexMap<K, V>, D>>,
        value_constraints: Vec<SharedConstraint<V, D>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = if state == ValidationState::Valid {
            initial.clone()
        } else {
            IndexMap::new()
        };
        let store = MapStore { snapshot, aggregator: MapChangeAggregator::default() };
        let machine = Machine::new(store, state, map_constraints, tx.clone());
        let mut property = Self {
            entries: initial,
            machine,
            value_constraints,
            elements: IndexMap::new(),
            next_element: 0,
            rx,
            tx,
        };
        if state == ValidationState::Unknown {
            property.machine.begin_batch();
            property.machine.start_all(&property.entries);
            for (key, value) in property.entries.clone() {
                property.machine.store_mut().record_added(key.clone(), value.clone());
                if property.tracks_elements() {
                    property.create_element(key, value);
                }
            }
            property.machine.end_batch();
        } else if property.tracks_elements() {
            // The asserted state takes the entries on faith; their
            // records exist but were never run.
            for (key, value) in property.entries.clone() {
                property.create_settled_element(key, value);
            }
        }
        property
    }

    fn tracks_elements(&self) -> bool {
        !self.value_constraints.is_empty()
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn entries(&self) -> &IndexMap<K, V> {
        &self.entries
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The constrained snapshot.
    pub fn constrained_value(&self) -> &IndexMap<K, V> {
        self.machine.snapshot()
    }

    pub fn state(&self) -> ValidationState {
        self.machine.state()
    }

    pub fn is_valid(&self) -> bool {
        self.machine.is_valid()
    }

    pub fn is_invalid(&self) -> bool {
        self.machine.is_invalid()
    }

    pub fn is_validating(&self) -> bool {
        self.machine.is_validating()
    }

    /// Diagnostics of the map constraints. Per-value diagnostics live on
    /// the element records.
    pub fn diagnostics(&self) -> &DiagnosticList<D> {
        self.machine.diagnostics()
    }

    /// The element record of `key`, if the entry was validated.
    pub fn element(&self, key: &K) -> Option<&ConstrainedElement<V, D>> {
        self.elements.get(key)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&K, &ConstrainedElement<V, D>)> {
        self.elements.iter()
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.entries.insert(key.clone(), value.clone());
        self.machine.begin_batch();
        self.machine.start_all(&self.entries);
        self.machine.store_mut().record_added(key.clone(), value.clone());
        if self.tracks_elements() {
            if let Some(mut element) = self.elements.shift_remove(&key) {
                element.dispose(&mut self.machine);
            }
            self.create_element(key, value);
        }
        self.machine.end_batch();
        old
    }

    /// Removes an entry. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.shift_remove(key)?;
        self.machine.begin_batch();
        self.machine.start_all(&self.entries);
        self.machine.store_mut().record_removed(key.clone());
        if let Some(mut element) = self.elements.shift_remove(key) {
            element.dispose(&mut self.machine);
        }
        self.machine.end_batch();
        Some(removed)
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let keys: Vec<K> = self.entries.keys().cloned().collect();
        self.entries.clear();
        self.machine.begin_batch();
        self.machine.start_all(&self.entries);
        for key in keys {
            self.machine.store_mut().record_removed(key);
        }
        self.dispose_all_elements();
        self.machine.end_batch();
    }

    /// Replaces the whole map.
    pub fn replace_all(&mut self, new_entries: IndexMap<K, V>) {
        let old_keys: Vec<K> = self.entries.keys().cloned().collect();
        self.entries = new_entries;
        self.machine.begin_batch();
        self.machine.start_all(&self.entries);
        for key in old_keys {
            self.machine.store_mut().record_removed(key);
        }
        self.dispose_all_elements();
        for (key, value) in self.entries.clone() {
            self.machine.store_mut().record_added(key.clone(), value.clone());
            if self.tracks_elements() {
                self.create_element(key, value);
            }
        }
        self.machine.end_batch();
    }

    /// Re-runs the map constraints and every element record against the
    /// current values.
    pub fn revalidate(&mut self) {
        self.machine.begin_batch();
        self.machine.start_all(&self.entries);
        let Self { elements, machine, tx, .. } = self;
        for element in elements.values_mut() {
            element.validate(machine, tx);
        }
        self.machine.end_batch();
    }

    fn create_element(&mut self, key: K, value: V) {
        let id = self.next_element;
        self.next_element += 1;
        let mut element = ConstrainedElement::new(id, value, &self.value_constraints);
        let (valid, invalid) = element.flags();
        self.machine.tally_mut().add(valid, invalid);
        element.validate(&mut self.machine, &self.tx);
        self.elements.insert(key, element);
    }

    fn create_settled_element(&mut self, key: K, value: V) {
        let id = self.next_element;
        self.next_element += 1;
        self.machine.tally_mut().add(true, false);
        self.elements
            .insert(key, ConstrainedElement::settled(id, value, &self.value_constraints));
    }

    fn dispose_all_elements(&mut self) {
        let Self { elements, machine, .. } = self;
        for (_, element) in elements.iter_mut() {
            element.dispose(machine);
        }
        elements.clear();
    }

    // ── Listeners and the pump ──────────────────────────────────────

    /// Registers a listener for validation flag changes.
    pub fn on_change(&mut self, listener: impl FnMut(ChangeKind, bool) + 'static) -> ListenerId {
        self.machine.add_listener(Box::new(listener))
    }

    /// Registers a listener fired when the constrained snapshot commits
    /// to a different map.
    pub fn on_constrained_value(
        &mut self,
        listener: impl FnMut(&IndexMap<K, V>) + 'static,
    ) -> ListenerId {
        self.machine.add_value_listener(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.machine.remove_listener(id)
    }

    /// Applies all ready asynchronous completions without blocking.
    /// Returns whether any completion was processed.
    pub fn pump(&mut self) -> bool {
        let mut any = false;
        while let Ok(completion) = self.rx.try_recv() {
            self.dispatch(completion);
            any = true;
        }
        any
    }

    /// Waits until no constraint run is in flight, applying completions
    /// as they arrive.
    pub async fn settle(&mut self) {
        self.pump();
        while self.machine.in_flight() {
            let Some(completion) = self.rx.recv().await else {
                break;
            };
            self.dispatch(completion);
        }
    }

    fn dispatch(&mut self, completion: Completion<D>) {
        match completion.target {
            CompletionTarget::Property => self.machine.handle_completion(completion),
            CompletionTarget::Element(id) => {
                let Self { elements, machine, tx, .. } = self;
                if let Some(element) = elements.values_mut().find(|e| e.id() == id) {
                    element.handle_completion(completion, machine, tx);
                } else {
                    tracing::trace!(element = id, "dropping completion for disposed element");
                }
            }
        }
    }
}
