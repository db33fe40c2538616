//! # veris-property
//!
//! Constrained observable properties over the `veris-constraint` model:
//! scalar, list and map shaped values whose mutations trigger constraint
//! validation, with a derived tri-state validation state and a
//! *constrained snapshot* holding the last value that passed every
//! constraint.
//!
//! ## Execution model
//!
//! Properties are single-owner: all mutation, listener dispatch and
//! state transitions happen through `&mut self` on the caller's task.
//! Deferred constraint runs are spawned on tokio and report back over a
//! channel owned by the property; call [`pump`] to apply ready results
//! without blocking, or [`settle`] to wait until no run is in flight.
//! Runs of one constraint are serialized: a newer value cancels the
//! in-flight run and only the newest superseded value is validated.
//!
//! ```
//! use veris_constraint::constraints::between;
//! use veris_property::{ConstrainedProperty, shared};
//!
//! let mut port = ConstrainedProperty::new(8080u32, vec![shared(between(1024, 65536))]);
//! assert!(port.is_valid());
//!
//! port.set(80);
//! assert!(port.is_invalid());
//! // the snapshot still holds the last valid value
//! assert_eq!(*port.constrained_value(), 8080);
//! ```
//!
//! [`pump`]: ConstrainedProperty::pump
//! [`settle`]: ConstrainedProperty::settle

use std::rc::Rc;

use veris_constraint::Constraint;

mod change;
mod diagnostics;
mod element;
mod list;
mod machine;
mod map;
mod pump;
mod scalar;
mod serialized;
mod state;
mod store;

pub use change::{ListChange, ReplacedRange};
pub use diagnostics::DiagnosticList;
pub use element::ConstrainedElement;
pub use list::ConstrainedListProperty;
pub use map::ConstrainedMapProperty;
pub use scalar::ConstrainedProperty;
pub use state::{ChangeKind, ListenerId, ValidationState};

/// A constraint shared between a property and its validation runs.
pub type SharedConstraint<T, D> = Rc<dyn Constraint<T, Diagnostic = D>>;

/// Wraps a constraint for attachment to a property.
pub fn shared<T, D>(constraint: impl Constraint<T, Diagnostic = D> + 'static) -> SharedConstraint<T, D> {
    Rc::new(constraint)
}
