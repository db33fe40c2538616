//! Per-constraint serialized execution state.

use std::rc::Rc;

use tokio_util::sync::CancellationToken;

use veris_constraint::Constraint;

/// One constraint of a property or element, plus the bookkeeping that
/// serializes its runs.
///
/// At most one deferred run per slot is in flight. When a new value
/// arrives while a run is active, the value is parked in `parked`, the
/// active run is cancelled, and the parked value starts once the
/// cancellation is observed; only the newest parked value survives.
pub(crate) struct Slot<T, D> {
    pub constraint: Rc<dyn Constraint<T, Diagnostic = D>>,
    /// Monotonic run counter; completions carrying an older value are
    /// stale and ignored.
    pub run: u64,
    /// Cancellation handle of the in-flight deferred run, if any.
    pub inflight: Option<CancellationToken>,
    /// Value of the in-flight run, stored so a successful completion can
    /// feed the snapshot.
    pub current: Option<T>,
    /// Newest value waiting for the in-flight run to wind down.
    pub parked: Option<T>,
    /// Result of the slot's last settled run: `Some(true)` valid,
    /// `Some(false)` invalid, `None` never completed or cancelled.
    pub last_valid: Option<bool>,
}

impl<T, D> Slot<T, D> {
    pub fn new(constraint: Rc<dyn Constraint<T, Diagnostic = D>>) -> Self {
        Self {
            constraint,
            run: 0,
            inflight: None,
            current: None,
            parked: None,
            last_valid: None,
        }
    }

    /// Parks `value` and cancels the in-flight run. Caller must have
    /// checked that a run is in flight.
    pub fn supersede(&mut self, value: T) {
        self.parked = Some(value);
        if let Some(token) = &self.inflight {
            token.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }
}
