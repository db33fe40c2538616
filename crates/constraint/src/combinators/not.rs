use crate::constraint::{Constraint, Evaluation};
use crate::result::ValidationResult;

/// Negation of a constraint. See [`ConstraintExt::not`].
///
/// Valid and invalid swap places; the diagnostic travels with the result.
/// A cancelled run stays cancelled.
///
/// [`ConstraintExt::not`]: crate::ConstraintExt::not
pub struct Not<C> {
    inner: C,
}

impl<C> Not<C> {
    pub(crate) fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Constraint<T> for Not<C>
where
    T: ?Sized,
    C: Constraint<T>,
    C::Diagnostic: Send + 'static,
{
    type Diagnostic = C::Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Self::Diagnostic> {
        match self.inner.constrain(value) {
            Evaluation::Complete(result) => Evaluation::Complete(invert(result)),
            Evaluation::Deferred(future) => {
                Evaluation::defer(async move { invert(future.await) })
            }
        }
    }
}

fn invert<D>(result: ValidationResult<D>) -> ValidationResult<D> {
    match result {
        ValidationResult::Valid(diag) => ValidationResult::Invalid(diag),
        ValidationResult::Invalid(diag) => ValidationResult::Valid(diag),
        ValidationResult::None => ValidationResult::None,
    }
}
