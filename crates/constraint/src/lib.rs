//! # veris-constraint
//!
//! The constraint model underlying the `veris` property layer: validation
//! results, diagnostics, the [`Constraint`] trait with synchronous and
//! deferred evaluation, logical combinators, and a library of built-in
//! constraints.
//!
//! ## Quick start
//!
//! ```
//! use veris_constraint::{Constraint, ConstraintExt, Evaluation, constraints};
//!
//! let port = constraints::between(1u32, 65536).and(constraints::greater_than(1023));
//!
//! let Evaluation::Complete(result) = port.constrain(&8080) else { unreachable!() };
//! assert!(result.is_valid());
//! ```
//!
//! Asynchronous constraints return [`Evaluation::Deferred`]; see
//! [`from_async`] and the combinator rules in [`combinators`].

pub mod combinators;
pub mod constraints;

mod constraint;
mod diagnostic;
mod error;
mod result;

pub use constraint::{
    AsyncConstraint, Constraint, ConstraintExt, Evaluation, FnConstraint, from_async, from_fn,
};
pub use diagnostic::Diagnostic;
pub use error::ConstraintError;
pub use result::ValidationResult;

/// Convenience imports for constraint authors.
pub mod prelude {
    pub use crate::constraint::{Constraint, ConstraintExt, Evaluation, from_async, from_fn};
    pub use crate::constraints::*;
    pub use crate::diagnostic::Diagnostic;
    pub use crate::error::ConstraintError;
    pub use crate::result::ValidationResult;
}
