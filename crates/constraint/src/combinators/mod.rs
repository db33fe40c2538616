//! Logical combinators over constraints.
//!
//! Combinators preserve the synchronous fast path: when every operand
//! completes inline, the combined evaluation is [`Complete`] too, so a
//! stack of synchronous constraints never touches the async machinery.
//! As soon as one operand defers, the combination defers as a whole.
//!
//! [`Complete`]: crate::Evaluation::Complete

mod and;
mod not;
mod or;
mod when;

pub use and::And;
pub use not::Not;
pub use or::Or;
pub use when::When;
