//! Scalar constrained property.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use veris_constraint::Diagnostic;

use crate::SharedConstraint;
use crate::diagnostics::DiagnosticList;
use crate::machine::Machine;
use crate::pump::Completion;
use crate::state::{ChangeKind, ListenerId, ValidationState};
use crate::store::ScalarStore;

/// An observable value of type `T` with attached constraints.
///
/// Every mutation starts a validation run over all constraints. The
/// live value (`get`) always reflects the latest mutation; the
/// constrained snapshot (`constrained_value`) only advances when the
/// property settles valid, so consumers of the snapshot never observe a
/// value that failed validation or is still being validated.
///
/// Constructed with [`ValidationState::Unknown`] (the `new` default),
/// the initial value is validated immediately; constructed with a known
/// state, validation is deferred until the first mutation.
pub struct ConstrainedProperty<T, D = Diagnostic> {
    value: T,
    machine: Machine<T, D, ScalarStore<T>>,
    rx: UnboundedReceiver<Completion<D>>,
    // Held so the channel outlives quiet periods with no runs in flight.
    _tx: UnboundedSender<Completion<D>>,
}

impl<T, D> ConstrainedProperty<T, D>
where
    T: Clone + PartialEq,
    D: Send + 'static,
{
    /// A property in the `Unknown` state; the initial value is validated
    /// immediately.
    pub fn new(initial: T, constraints: Vec<SharedConstraint<T, D>>) -> Self {
        Self::with_state(initial, ValidationState::Unknown, constraints)
    }

    /// A property whose initial validation state is asserted by the
    /// caller. With `Valid` or `Invalid`, constraints first run on the
    /// first mutation.
    pub fn with_state(
        initial: T,
        state: ValidationState,
        constraints: Vec<SharedConstraint<T, D>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let machine = Machine::new(
            ScalarStore::new(initial.clone()),
            state,
            constraints,
            tx.clone(),
        );
        let mut property = Self { value: initial, machine, rx, _tx: tx };
        if state == ValidationState::Unknown {
            property.machine.run_validation(&property.value);
        }
        property
    }

    /// The live value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replaces the live value and starts a validation run. Setting a
    /// value equal to the current one is a no-op.
    pub fn set(&mut self, value: T) {
        if value == self.value {
            return;
        }
        self.value = value;
        self.machine.run_validation(&self.value);
    }

    /// The constrained snapshot: the last value that passed every
    /// constraint (or the initial value before any commit).
    pub fn constrained_value(&self) -> &T {
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

    pub fn diagnostics(&self) -> &DiagnosticList<D> {
        self.machine.diagnostics()
    }

    /// Re-runs all constraints against the live value. The hook for
    /// constraints whose outcome depends on external state.
    pub fn revalidate(&mut self) {
        self.machine.run_validation(&self.value);
    }

    /// Registers a listener for validation flag changes.
    pub fn on_change(&mut self, listener: impl FnMut(ChangeKind, bool) + 'static) -> ListenerId {
        self.machine.add_listener(Box::new(listener))
    }

    /// Registers a listener fired when the constrained snapshot commits
    /// to a different value.
    pub fn on_constrained_value(&mut self, listener: impl FnMut(&T) + 'static) -> ListenerId {
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
            self.machine.handle_completion(completion);
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
            self.machine.handle_completion(completion);
        }
    }
}
