//! The core [`Constraint`] trait and its closure adapters.

use std::fmt;
use std::future::Future;

use futures::future::{self, BoxFuture};

use crate::combinators::{And, Not, Or, When};
use crate::result::ValidationResult;

/// What a constraint evaluation produces: either an immediately available
/// result, or a future that resolves to one.
///
/// Deferred futures must be `Send + 'static` so the property layer can run
/// them on a worker task; they therefore own everything they need (the
/// closure adapters clone the value in).
pub enum Evaluation<D> {
    /// The constraint evaluated synchronously.
    Complete(ValidationResult<D>),
    /// The constraint runs asynchronously.
    Deferred(BoxFuture<'static, ValidationResult<D>>),
}

impl<D> Evaluation<D> {
    /// Wraps an already-computed result.
    pub fn complete(result: ValidationResult<D>) -> Self {
        Self::Complete(result)
    }

    /// Boxes a future into a deferred evaluation.
    pub fn defer<F>(future: F) -> Self
    where
        F: Future<Output = ValidationResult<D>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Converts either variant into a future.
    pub fn into_future(self) -> BoxFuture<'static, ValidationResult<D>>
    where
        D: Send + 'static,
    {
        match self {
            Self::Complete(result) => Box::pin(future::ready(result)),
            Self::Deferred(future) => future,
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for Evaluation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(result) => f.debug_tuple("Complete").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A validation rule over values of type `T`.
///
/// Constraints only observe the value; they never mutate it. A constraint
/// that needs to do I/O returns [`Evaluation::Deferred`] and lets the
/// caller decide where the future runs.
pub trait Constraint<T: ?Sized> {
    /// The diagnostic type attached to results of this constraint.
    type Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Self::Diagnostic>;
}

/// A synchronous constraint built from a closure. See [`from_fn`].
pub struct FnConstraint<F>(F);

impl<T, D, F> Constraint<T> for FnConstraint<F>
where
    T: ?Sized,
    F: Fn(&T) -> ValidationResult<D>,
{
    type Diagnostic = D;

    fn constrain(&self, value: &T) -> Evaluation<D> {
        Evaluation::Complete((self.0)(value))
    }
}

/// Builds a constraint from a synchronous closure.
pub fn from_fn<T, D, F>(f: F) -> FnConstraint<F>
where
    T: ?Sized,
    F: Fn(&T) -> ValidationResult<D>,
{
    FnConstraint(f)
}

/// An asynchronous constraint built from a closure. See [`from_async`].
pub struct AsyncConstraint<F>(F);

impl<T, D, F, Fut> Constraint<T> for AsyncConstraint<F>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ValidationResult<D>> + Send + 'static,
{
    type Diagnostic = D;

    fn constrain(&self, value: &T) -> Evaluation<D> {
        Evaluation::defer((self.0)(value.clone()))
    }
}

/// Builds a constraint from an asynchronous closure. The value is cloned
/// into the returned future, so the future owns its input.
pub fn from_async<T, D, F, Fut>(f: F) -> AsyncConstraint<F>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ValidationResult<D>> + Send + 'static,
{
    AsyncConstraint(f)
}

/// Fluent combinator methods, implemented for every constraint.
pub trait ConstraintExt<T: ?Sized>: Constraint<T> + Sized {
    /// Valid when both constraints are valid; stops at the first invalid
    /// or cancelled result.
    fn and<R>(self, other: R) -> And<Self, R>
    where
        R: Constraint<T, Diagnostic = Self::Diagnostic>,
    {
        And::new(self, other)
    }

    /// Valid when either constraint is valid; stops at the first valid
    /// result.
    fn or<R>(self, other: R) -> Or<Self, R>
    where
        R: Constraint<T, Diagnostic = Self::Diagnostic>,
    {
        Or::new(self, other)
    }

    /// Inverts valid and invalid; cancellation passes through.
    fn not(self) -> Not<Self> {
        Not::new(self)
    }

    /// Applies the constraint only when `predicate` holds; otherwise the
    /// value is valid by default.
    fn when<P>(self, predicate: P) -> When<Self, P>
    where
        P: Fn(&T) -> bool,
    {
        When::new(self, predicate)
    }
}

impl<T: ?Sized, C: Constraint<T>> ConstraintExt<T> for C {}
