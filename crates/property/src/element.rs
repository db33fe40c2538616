//! Per-element validation records for container properties.

use std::rc::Rc;

use smallvec::SmallVec;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use veris_constraint::{Constraint, Evaluation, ValidationResult};

use crate::diagnostics::DiagnosticList;
use crate::machine::{Machine, RunState};
use crate::pump::{Completion, CompletionTarget, Outcome, spawn_run};
use crate::serialized::Slot;
use crate::state::ValidationState;
use crate::store::DeferredValue;

/// Validation record of one container element.
///
/// Created when an element enters the container, disposed when it
/// leaves. Each record runs the element constraints against its own
/// value, keeps its own flags and diagnostics, and reports every run
/// transition to the parent property's machine so the container-level
/// state folds element results in.
///
/// Records are identified by a property-unique id; completions of runs
/// whose record was disposed in the meantime carry a dead id and are
/// dropped by the property.
pub struct ConstrainedElement<E, D> {
    id: u64,
    value: E,
    slots: SmallVec<[Slot<E, D>; 2]>,
    diagnostics: DiagnosticList<D>,
    valid: bool,
    invalid: bool,
    validating: bool,
    in_flight: usize,
}

impl<E, D> ConstrainedElement<E, D> {
    pub(crate) fn new(
        id: u64,
        value: E,
        constraints: &[Rc<dyn Constraint<E, Diagnostic = D>>],
    ) -> Self {
        Self {
            id,
            value,
            slots: constraints.iter().map(|c| Slot::new(Rc::clone(c))).collect(),
            diagnostics: DiagnosticList::new(),
            valid: constraints.is_empty(),
            invalid: false,
            validating: false,
            in_flight: 0,
        }
    }

    /// A record settled valid without running its constraints, for
    /// containers constructed with an asserted validation state.
    pub(crate) fn settled(
        id: u64,
        value: E,
        constraints: &[Rc<dyn Constraint<E, Diagnostic = D>>],
    ) -> Self {
        let mut record = Self::new(id, value, constraints);
        for slot in &mut record.slots {
            slot.last_valid = Some(true);
        }
        record.valid = true;
        record
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn value(&self) -> &E {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn is_validating(&self) -> bool {
        self.validating
    }

    pub fn diagnostics(&self) -> &DiagnosticList<D> {
        &self.diagnostics
    }

    pub(crate) fn flags(&self) -> (bool, bool) {
        (self.valid, self.invalid)
    }

    /// Element state over the record's own slots.
    fn slot_state(&self) -> ValidationState {
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
            ValidationState::Valid
        }
    }
}

impl<E, D> ConstrainedElement<E, D>
where
    E: Clone,
    D: Send + 'static,
{
    /// Starts a run of every element constraint.
    ///
    /// All starts are announced before any slot executes, so a slot
    /// completing synchronously cannot fold stale peer results into the
    /// parent's state.
    pub(crate) fn validate<T, S>(
        &mut self,
        machine: &mut Machine<T, D, S>,
        tx: &UnboundedSender<Completion<D>>,
    ) where
        T: Clone,
        S: DeferredValue<T>,
    {
        if self.slots.is_empty() {
            return;
        }
        // Unsettled until the new run completes.
        if self.valid {
            self.valid = false;
            machine.tally_mut().valid_changed(false);
        }
        let mut pending = SmallVec::<[usize; 2]>::new();
        for index in 0..self.slots.len() {
            if self.slots[index].is_busy() {
                let value = self.value.clone();
                self.slots[index].supersede(value);
            } else {
                machine.notify_run_state(RunState::Started, false);
                self.in_flight += 1;
                self.validating = true;
                pending.push(index);
            }
        }
        for index in pending {
            self.execute_slot(index, machine, tx);
        }
    }

    fn validate_slot<T, S>(
        &mut self,
        index: usize,
        machine: &mut Machine<T, D, S>,
        tx: &UnboundedSender<Completion<D>>,
    ) where
        T: Clone,
        S: DeferredValue<T>,
    {
        if self.slots[index].is_busy() {
            let value = self.value.clone();
            self.slots[index].supersede(value);
            return;
        }
        machine.notify_run_state(RunState::Started, false);
        self.in_flight += 1;
        self.validating = true;
        self.execute_slot(index, machine, tx);
    }

    fn execute_slot<T, S>(
        &mut self,
        index: usize,
        machine: &mut Machine<T, D, S>,
        tx: &UnboundedSender<Completion<D>>,
    ) where
        T: Clone,
        S: DeferredValue<T>,
    {
        let constraint = Rc::clone(&self.slots[index].constraint);
        match constraint.constrain(&self.value) {
            Evaluation::Complete(result) => {
                self.complete_slot(index, result.into_option(), false, machine);
            }
            Evaluation::Deferred(future) => {
                let slot = &mut self.slots[index];
                slot.run += 1;
                let token = CancellationToken::new();
                slot.inflight = Some(token.clone());
                spawn_run(
                    future,
                    token,
                    tx.clone(),
                    CompletionTarget::Element(self.id),
                    index,
                    slot.run,
                );
            }
        }
    }

    /// Applies a completion the property routed to this record.
    pub(crate) fn handle_completion<T, S>(
        &mut self,
        completion: Completion<D>,
        machine: &mut Machine<T, D, S>,
        tx: &UnboundedSender<Completion<D>>,
    ) where
        T: Clone,
        S: DeferredValue<T>,
    {
        let index = completion.index;
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if completion.run != slot.run || slot.inflight.is_none() {
            tracing::trace!(
                element = self.id,
                index,
                run = completion.run,
                "dropping stale element completion"
            );
            return;
        }

        slot.inflight = None;
        let followup = slot.parked.take();
        let intermediate = followup.is_some();
        let outcome = if intermediate {
            None
        } else {
            match completion.outcome {
                Outcome::Finished(result) => result.into_option(),
                Outcome::Cancelled => None,
            }
        };
        self.complete_slot(index, outcome, intermediate, machine);

        // The parked value is by construction the element's own value;
        // just start the slot again.
        if followup.is_some() {
            self.validate_slot(index, machine, tx);
        }
    }

    fn complete_slot<T, S>(
        &mut self,
        index: usize,
        outcome: Option<ValidationResult<D>>,
        intermediate: bool,
        machine: &mut Machine<T, D, S>,
    ) where
        T: Clone,
        S: DeferredValue<T>,
    {
        debug_assert!(self.in_flight > 0);
        self.in_flight -= 1;
        if self.in_flight == 0 {
            self.validating = false;
        }

        match outcome {
            None => {
                self.slots[index].last_valid = None;
                machine.notify_run_state(RunState::Cancelled, intermediate);
            }
            Some(result) => {
                let valid = result.is_valid();
                self.slots[index].last_valid = Some(valid);
                match result.into_diagnostic() {
                    Some(diagnostic) => self.diagnostics.set(index, diagnostic, valid),
                    None => self.diagnostics.clear(index),
                }
                if valid {
                    if self.in_flight == 0 {
                        let state = self.slot_state();
                        self.update_flags(
                            state == ValidationState::Valid,
                            state == ValidationState::Invalid,
                            machine,
                        );
                    }
                    machine.notify_run_state(RunState::Succeeded, intermediate);
                } else {
                    self.update_flags(false, true, machine);
                    machine.notify_run_state(RunState::Failed, intermediate);
                }
            }
        }
    }

    /// Cancels everything in flight and unwinds this record's share of
    /// the parent's in-flight count. The caller drops the record.
    pub(crate) fn dispose<T, S>(&mut self, machine: &mut Machine<T, D, S>)
    where
        T: Clone,
        S: DeferredValue<T>,
    {
        for slot in &mut self.slots {
            if let Some(token) = slot.inflight.take() {
                token.cancel();
            }
            slot.parked = None;
        }
        for _ in 0..self.in_flight {
            machine.notify_run_state(RunState::Cancelled, false);
        }
        self.in_flight = 0;
        self.validating = false;
        machine.tally_mut().remove(self.valid, self.invalid);
    }

    fn update_flags<T, S>(&mut self, valid: bool, invalid: bool, machine: &mut Machine<T, D, S>)
    where
        T: Clone,
        S: DeferredValue<T>,
    {
        if self.valid != valid {
            self.valid = valid;
            machine.tally_mut().valid_changed(valid);
        }
        if self.invalid != invalid {
            self.invalid = invalid;
            machine.tally_mut().invalid_changed(invalid);
        }
    }
}
