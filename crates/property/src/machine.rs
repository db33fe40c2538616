//! The per-property validation state machine.
//!
//! One machine sits behind every constrained property. It owns the
//! property's constraint slots, the derived valid/invalid/validating
//! flags, the diagnostic list, the snapshot store, and the listener
//! registry. Container properties additionally feed it an element tally
//! so the derived state can fold in per-element results without the
//! machine holding the element records themselves.

use std::rc::Rc;

use smallvec::SmallVec;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use veris_constraint::{Constraint, Evaluation, ValidationResult};

use crate::diagnostics::DiagnosticList;
use crate::pump::{Completion, CompletionTarget, Outcome, spawn_run};
use crate::serialized::Slot;
use crate::state::{ChangeKind, ListenerId, ValidationState};
use crate::store::DeferredValue;

/// Lifecycle points of a single constraint run, as seen by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Started,
    Succeeded,
    Failed,
    Cancelled,
}

/// The three observable flags, tracked twice: the live values and the
/// values last reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flags {
    valid: bool,
    invalid: bool,
    validating: bool,
}

/// Summary of the element records of a container property.
///
/// Elements report flag transitions here instead of the machine walking
/// the records; the derived state only needs the counts.
#[derive(Debug, Default)]
pub(crate) struct ElementTally {
    invalid: usize,
    /// Elements whose valid flag is currently false (invalid, still
    /// validating, or cancelled).
    unsettled: usize,
}

impl ElementTally {
    pub fn add(&mut self, valid: bool, invalid: bool) {
        if invalid {
            self.invalid += 1;
        }
        if !valid {
            self.unsettled += 1;
        }
    }

    pub fn remove(&mut self, valid: bool, invalid: bool) {
        if invalid {
            self.invalid -= 1;
        }
        if !valid {
            self.unsettled -= 1;
        }
    }

    pub fn valid_changed(&mut self, now_valid: bool) {
        if now_valid {
            self.unsettled -= 1;
        } else {
            self.unsettled += 1;
        }
    }

    pub fn invalid_changed(&mut self, now_invalid: bool) {
        if now_invalid {
            self.invalid += 1;
        } else {
            self.invalid -= 1;
        }
    }

    pub fn state(&self) -> ValidationState {
        if self.invalid > 0 {
            ValidationState::Invalid
        } else if self.unsettled > 0 {
            ValidationState::Unknown
        } else {
            ValidationState::Valid
        }
    }
}

type ChangeListener = Box<dyn FnMut(ChangeKind, bool)>;
type ValueListener<T> = Box<dyn FnMut(&T)>;

pub(crate) struct Machine<T, D, S> {
    slots: SmallVec<[Slot<T, D>; 2]>,
    store: S,
    diagnostics: DiagnosticList<D>,
    tally: ElementTally,
    current: Flags,
    last: Flags,
    /// Number of constraint runs in flight, element runs included.
    validating: usize,
    /// While quiescent, flag notifications are held back and fired once
    /// at the end of the batch.
    quiescent: bool,
    listeners: Vec<(ListenerId, ChangeListener)>,
    value_listeners: Vec<(ListenerId, ValueListener<T>)>,
    next_listener: u64,
    tx: UnboundedSender<Completion<D>>,
}

impl<T, D, S> Machine<T, D, S>
where
    T: Clone,
    D: Send + 'static,
    S: DeferredValue<T>,
{
    pub fn new(
        store: S,
        initial: ValidationState,
        constraints: Vec<Rc<dyn Constraint<T, Diagnostic = D>>>,
        tx: UnboundedSender<Completion<D>>,
    ) -> Self {
        let slots: SmallVec<[Slot<T, D>; 2]> =
            constraints.into_iter().map(Slot::new).collect();
        let flags = Flags {
            valid: slots.is_empty() || initial == ValidationState::Valid,
            invalid: initial == ValidationState::Invalid,
            validating: false,
        };
        Self {
            slots,
            store,
            diagnostics: DiagnosticList::new(),
            tally: ElementTally::default(),
            current: flags,
            last: flags,
            validating: 0,
            quiescent: false,
            listeners: Vec::new(),
            value_listeners: Vec::new(),
            next_listener: 0,
            tx,
        }
    }

    // ── Derived state ───────────────────────────────────────────────

    pub fn is_valid(&self) -> bool {
        self.current.valid
    }

    pub fn is_invalid(&self) -> bool {
        self.current.invalid
    }

    pub fn is_validating(&self) -> bool {
        self.current.validating
    }

    pub fn state(&self) -> ValidationState {
        if self.current.valid {
            ValidationState::Valid
        } else if self.current.invalid {
            ValidationState::Invalid
        } else {
            ValidationState::Unknown
        }
    }

    pub fn in_flight(&self) -> bool {
        self.validating > 0
    }

    pub fn diagnostics(&self) -> &DiagnosticList<D> {
        &self.diagnostics
    }

    pub fn snapshot(&self) -> &T {
        self.store.value()
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn tally_mut(&mut self) -> &mut ElementTally {
        &mut self.tally
    }

    /// Combined state over the machine's own constraints and the element
    /// tally. Only meaningful when no run is in flight.
    fn combined_state(&self) -> ValidationState {
        let mut unknown = false;
        for slot in &self.slots {
            match slot.last_valid {
                Some(false) => return ValidationState::Invalid,
                Some(true) => {}
                None => unknown = true,
            }
        }
        if unknown {
            ValidationState::Unknown
        } else {
            self.tally.state()
        }
    }

    // ── Listeners ───────────────────────────────────────────────────

    pub fn add_listener(&mut self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn add_value_listener(&mut self, listener: ValueListener<T>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.value_listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let flags = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        let values = self.value_listeners.len();
        self.value_listeners.retain(|(lid, _)| *lid != id);
        flags != self.listeners.len() || values != self.value_listeners.len()
    }

    // ── Batching ────────────────────────────────────────────────────

    pub fn begin_batch(&mut self) {
        debug_assert!(!self.quiescent, "batch already open");
        self.quiescent = true;
    }

    /// Closes a batch: settles the flags if nothing is in flight and
    /// fires the notifications held back during the batch.
    pub fn end_batch(&mut self) {
        debug_assert!(self.quiescent, "no batch open");
        self.quiescent = false;
        if self.validating == 0 {
            let state = self.combined_state();
            self.settle(state);
            if state == ValidationState::Valid {
                self.apply_snapshot();
            }
        }
        self.fire_flag_changes();
    }

    /// Runs all of the machine's own constraints against `value` inside
    /// one batch. The scalar property's whole validation pass.
    pub fn run_validation(&mut self, value: &T) {
        self.begin_batch();
        self.start_all(value);
        self.end_batch();
    }

    // ── Run lifecycle ───────────────────────────────────────────────

    /// Starts a run of every constraint slot against `value`. With no
    /// slots the value is stored directly; the enclosing batch commits
    /// it if the property settles valid.
    ///
    /// All starts are announced before any slot executes, so a slot
    /// completing synchronously cannot settle the property against a
    /// peer's stale result.
    pub fn start_all(&mut self, value: &T) {
        if self.slots.is_empty() {
            self.store.store(value);
            return;
        }
        let mut pending = SmallVec::<[usize; 2]>::new();
        for index in 0..self.slots.len() {
            if self.slots[index].is_busy() {
                self.slots[index].supersede(value.clone());
            } else {
                self.diagnostics.clear(index);
                self.notify_run_state(RunState::Started, false);
                pending.push(index);
            }
        }
        for index in pending {
            self.execute_run(index, value);
        }
    }

    /// Starts one constraint slot. A busy slot parks the value instead;
    /// the parked value runs when the cancellation is observed.
    pub fn start_run(&mut self, index: usize, value: &T) {
        if self.slots[index].is_busy() {
            self.slots[index].supersede(value.clone());
            return;
        }
        self.diagnostics.clear(index);
        self.notify_run_state(RunState::Started, false);
        self.execute_run(index, value);
    }

    fn execute_run(&mut self, index: usize, value: &T) {
        let constraint = Rc::clone(&self.slots[index].constraint);
        match constraint.constrain(value) {
            Evaluation::Complete(result) => {
                self.complete_run(index, Some(value), result.into_option(), false);
            }
            Evaluation::Deferred(future) => {
                let slot = &mut self.slots[index];
                slot.run += 1;
                let token = CancellationToken::new();
                slot.inflight = Some(token.clone());
                slot.current = Some(value.clone());
                spawn_run(future, token, self.tx.clone(), CompletionTarget::Property, index, slot.run);
            }
        }
    }

    /// Applies a completion delivered through the pump.
    pub fn handle_completion(&mut self, completion: Completion<D>) {
        let index = completion.index;
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if completion.run != slot.run || slot.inflight.is_none() {
            // A newer run has superseded this one.
            tracing::trace!(index, run = completion.run, "dropping stale completion");
            return;
        }

        slot.inflight = None;
        let value = slot.current.take();
        let followup = slot.parked.take();
        let intermediate = followup.is_some();
        // A superseded run never settles its slot, whatever its outcome.
        let outcome = if intermediate {
            None
        } else {
            match completion.outcome {
                Outcome::Finished(result) => result.into_option(),
                Outcome::Cancelled => None,
            }
        };
        self.complete_run(index, value.as_ref(), outcome, intermediate);

        if let Some(next) = followup {
            self.start_run(index, &next);
        }
    }

    /// Settles one slot's run. `outcome` is `None` for cancelled runs.
    fn complete_run(
        &mut self,
        index: usize,
        value: Option<&T>,
        outcome: Option<ValidationResult<D>>,
        intermediate: bool,
    ) {
        match outcome {
            None => {
                self.slots[index].last_valid = None;
                self.notify_run_state(RunState::Cancelled, intermediate);
            }
            Some(result) => {
                let valid = result.is_valid();
                self.slots[index].last_valid = Some(valid);
                match result.into_diagnostic() {
                    Some(diagnostic) => self.diagnostics.set(index, diagnostic, valid),
                    None => self.diagnostics.clear(index),
                }
                if valid {
                    if let Some(value) = value {
                        self.store.store(value);
                    }
                    self.notify_run_state(RunState::Succeeded, intermediate);
                } else {
                    self.notify_run_state(RunState::Failed, intermediate);
                }
            }
        }
    }

    /// Folds one run transition into the flags and the in-flight count.
    /// Shared by the machine's own slots and the element records.
    pub fn notify_run_state(&mut self, run_state: RunState, intermediate: bool) {
        match run_state {
            RunState::Started => {
                if self.validating == 0 {
                    self.current.validating = true;
                    self.current.valid = false;
                    self.current.invalid = false;
                }
                self.validating += 1;
                if !self.quiescent {
                    self.fire_flag_changes();
                }
            }
            RunState::Succeeded => {
                debug_assert!(self.validating > 0);
                self.validating -= 1;
                // Inside a batch, settling is the batch end's job.
                if self.validating == 0 && !self.quiescent {
                    let state = self.combined_state();
                    if !intermediate {
                        self.settle(state);
                    }
                    if state == ValidationState::Valid {
                        self.apply_snapshot();
                    }
                    self.fire_flag_changes();
                }
            }
            RunState::Failed => {
                debug_assert!(self.validating > 0);
                self.current.valid = false;
                self.current.invalid = true;
                self.validating -= 1;
                self.current.validating = self.validating > 0;
                if !intermediate && !self.quiescent {
                    self.fire_flag_changes();
                }
            }
            RunState::Cancelled => {
                debug_assert!(self.validating > 0);
                self.validating -= 1;
                if self.validating == 0 {
                    self.current.validating = false;
                    if !intermediate && !self.quiescent {
                        self.fire_flag_changes();
                    }
                }
            }
        }
    }

    fn settle(&mut self, state: ValidationState) {
        self.current.validating = false;
        self.current.valid = state == ValidationState::Valid;
        self.current.invalid = state == ValidationState::Invalid;
    }

    fn apply_snapshot(&mut self) {
        if self.store.apply() {
            let value = self.store.value();
            for (_, listener) in &mut self.value_listeners {
                listener(value);
            }
        }
    }

    /// Fires one notification per facet whose value changed since the
    /// last notification.
    fn fire_flag_changes(&mut self) {
        if self.current.valid != self.last.valid {
            self.last.valid = self.current.valid;
            let value = self.current.valid;
            for (_, listener) in &mut self.listeners {
                listener(ChangeKind::Valid, value);
            }
        }
        if self.current.invalid != self.last.invalid {
            self.last.invalid = self.current.invalid;
            let value = self.current.invalid;
            for (_, listener) in &mut self.listeners {
                listener(ChangeKind::Invalid, value);
            }
        }
        if self.current.validating != self.last.validating {
            self.last.validating = self.current.validating;
            let value = self.current.validating;
            for (_, listener) in &mut self.listeners {
                listener(ChangeKind::Validating, value);
            }
        }
    }
}
