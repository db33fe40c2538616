//! List constrained property.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use veris_constraint::Diagnostic;

use crate::SharedConstraint;
use crate::change::{ListChange, ListChangeAggregator};
use crate::diagnostics::DiagnosticList;
use crate::element::ConstrainedElement;
use crate::machine::Machine;
use crate::pump::{Completion, CompletionTarget};
use crate::state::{ChangeKind, ListenerId, ValidationState};
use crate::store::DeferredValue;

/// Snapshot store for list properties.
///
/// The snapshot is not rebuilt from the live list on commit; the
/// mutations recorded since the last commit are merged and the merged
/// range is spliced in. Elements added and removed between two commits
/// therefore never appear in the snapshot.
struct ListStore<E> {
    snapshot: Vec<E>,
    aggregator: ListChangeAggregator<E>,
}

impl<E: Clone + PartialEq> ListStore<E> {
    fn record(&mut self, change: &ListChange<E>) {
        self.aggregator.add(change, &self.snapshot);
    }
}

impl<E: Clone + PartialEq> DeferredValue<Vec<E>> for ListStore<E> {
    fn store(&mut self, _value: &Vec<E>) {
        // The snapshot advances through recorded changes only.
    }

    fn apply(&mut self) -> bool {
        let change = self.aggregator.complete(&self.snapshot);
        if change.is_empty() {
            return false;
        }
        change.apply_to(&mut self.snapshot);
        true
    }

    fn value(&self) -> &Vec<E> {
        &self.snapshot
    }
}

/// An observable `Vec<E>` with attached constraints.
///
/// Two constraint classes apply: *list constraints* validate the list
/// as a whole on every mutation, and *element constraints* validate
/// each element independently through a [`ConstrainedElement`] record
/// created when the element enters the list and disposed when it
/// leaves. The property is valid only when the list constraints and
/// every element record are valid.
///
/// Element records mirror the items one to one. Constructing with an
/// asserted known state takes the initial items on faith: their records
/// start settled valid without running, mirroring the deferred initial
/// validation of the scalar property.
pub struct ConstrainedListProperty<E, D = Diagnostic> {
    items: Vec<E>,
    machine: Machine<Vec<E>, D, ListStore<E>>,
    element_constraints: Vec<SharedConstraint<E, D>>,
    elements: Vec<ConstrainedElement<E, D>>,
    next_element: u64,
    rx: UnboundedReceiver<Completion<D>>,
    tx: UnboundedSender<Completion<D>>,
}

impl<E, D> ConstrainedListProperty<E, D>
where
    E: Clone + PartialEq,
    D: Send + 'static,
{
    /// A property in the `Unknown` state; all initial items are
    /// validated immediately.
    pub fn new(
        initial: Vec<E>,
        list_constraints: Vec<SharedConstraint<Vec<E>, D>>,
        element_constraints: Vec<SharedConstraint<E, D>>,
    ) -> Self {
        Self::with_state(
            initial,
            ValidationState::Unknown,
            list_constraints,
            element_constraints,
        )
    }

    /// A property whose initial validation state is asserted by the
    /// caller. With `Valid` the snapshot starts as a copy of the items;
    /// otherwise it starts empty and fills on the first commit.
    pub fn with_state(
        initial: Vec<E>,
        state: ValidationState,
        list_constraints: Vec<SharedConstraint<Vec<E>, D>>,
        element_constraints: Vec<SharedConstraint<E, D>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = if state == ValidationState::Valid {
            initial.clone()
        } else {
            Vec::new()
        };
        let store = ListStore { snapshot, aggregator: ListChangeAggregator::default() };
        let machine = Machine::new(store, state, list_constraints, tx.clone());
        let mut property = Self {
            items: initial,
            machine,
            element_constraints,
            elements: Vec::new(),
            next_element: 0,
            rx,
            tx,
        };
        if state == ValidationState::Unknown {
            property.machine.begin_batch();
            property.machine.start_all(&property.items);
            property
                .machine
                .store_mut()
                .record(&ListChange::Added { from: 0, elements: property.items.clone() });
            if property.tracks_elements() {
                for (index, value) in property.items.clone().into_iter().enumerate() {
                    property.create_element(index, value);
                }
            }
            property.machine.end_batch();
        } else if property.tracks_elements() {
            // The asserted state takes the items on faith; their records
            // exist but were never run.
            for value in property.items.clone() {
                property.create_settled_element(value);
            }
        }
        property
    }

    fn tracks_elements(&self) -> bool {
        !self.element_constraints.is_empty()
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The constrained snapshot.
    pub fn constrained_value(&self) -> &[E] {
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

    /// Diagnostics of the list constraints. Element diagnostics live on
    /// the element records.
    pub fn diagnostics(&self) -> &DiagnosticList<D> {
        self.machine.diagnostics()
    }

    /// Element records, in list order.
    pub fn elements(&self) -> &[ConstrainedElement<E, D>] {
        &self.elements
    }

    // ── Mutations ───────────────────────────────────────────────────

    pub fn push(&mut self, value: E) {
        self.insert(self.items.len(), value);
    }

    pub fn insert(&mut self, index: usize, value: E) {
        self.items.insert(index, value.clone());
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        self.machine
            .store_mut()
            .record(&ListChange::Added { from: index, elements: vec![value.clone()] });
        if self.tracks_elements() {
            self.create_element(index, value);
        }
        self.machine.end_batch();
    }

    pub fn remove(&mut self, index: usize) -> E {
        let removed = self.items.remove(index);
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        self.machine
            .store_mut()
            .record(&ListChange::Removed { from: index, count: 1 });
        if self.tracks_elements() {
            let mut element = self.elements.remove(index);
            element.dispose(&mut self.machine);
        }
        self.machine.end_batch();
        removed
    }

    /// Replaces the element at `index`, returning the old value.
    pub fn set(&mut self, index: usize, value: E) -> E {
        let old = std::mem::replace(&mut self.items[index], value.clone());
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        self.machine.store_mut().record(&ListChange::Replaced {
            from: index,
            count: 1,
            elements: vec![value.clone()],
        });
        if self.tracks_elements() {
            let mut element = self.elements.remove(index);
            element.dispose(&mut self.machine);
            self.create_element(index, value);
        }
        self.machine.end_batch();
        old
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let count = self.items.len();
        self.items.clear();
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        self.machine
            .store_mut()
            .record(&ListChange::Removed { from: 0, count });
        self.dispose_all_elements();
        self.machine.end_batch();
    }

    /// Replaces the whole list.
    pub fn replace_all(&mut self, new_items: Vec<E>) {
        let old_count = self.items.len();
        self.items = new_items;
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        self.machine
            .store_mut()
            .record(&ListChange::Removed { from: 0, count: old_count });
        self.machine
            .store_mut()
            .record(&ListChange::Added { from: 0, elements: self.items.clone() });
        if self.tracks_elements() {
            self.dispose_all_elements();
            for (index, value) in self.items.clone().into_iter().enumerate() {
                self.create_element(index, value);
            }
        }
        self.machine.end_batch();
    }

    /// Re-runs the list constraints and every element record against the
    /// current values.
    pub fn revalidate(&mut self) {
        self.machine.begin_batch();
        self.machine.start_all(&self.items);
        let Self { elements, machine, tx, .. } = self;
        for element in elements.iter_mut() {
            element.validate(machine, tx);
        }
        self.machine.end_batch();
    }

    fn create_element(&mut self, position: usize, value: E) {
        let id = self.next_element;
        self.next_element += 1;
        let mut element = ConstrainedElement::new(id, value, &self.element_constraints);
        let (valid, invalid) = element.flags();
        self.machine.tally_mut().add(valid, invalid);
        element.validate(&mut self.machine, &self.tx);
        self.elements.insert(position, element);
    }

    fn create_settled_element(&mut self, value: E) {
        let id = self.next_element;
        self.next_element += 1;
        self.machine.tally_mut().add(true, false);
        self.elements.push(ConstrainedElement::settled(id, value, &self.element_constraints));
    }

    fn dispose_all_elements(&mut self) {
        let Self { elements, machine, .. } = self;
        for element in elements.iter_mut() {
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
    /// to a different list.
    pub fn on_constrained_value(&mut self, listener: impl FnMut(&Vec<E>) + 'static) -> ListenerId {
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
                if let Some(element) = elements.iter_mut().find(|e| e.id() == id) {
                    element.handle_completion(completion, machine, tx);
                } else {
                    tracing::trace!(element = id, "dropping completion for disposed element");
                }
            }
        }
    }
}
