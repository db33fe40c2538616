use crate::constraint::{Constraint, Evaluation};
use crate::result::ValidationResult;

/// Conjunction of two constraints. See [`ConstraintExt::and`].
///
/// The left operand is evaluated first. An invalid or cancelled left
/// result short-circuits: the right operand is not evaluated at all.
/// When both sides are valid, the right side's diagnostic wins, falling
/// back to the left one.
///
/// [`ConstraintExt::and`]: crate::ConstraintExt::and
pub struct And<L, R> {
    left: L,
    right: R,
}

impl<L, R> And<L, R> {
    pub(crate) fn new(left: L, right: R) -> Self {
        Self { left, right }
    }
}

impl<T, L, R> Constraint<T> for And<L, R>
where
    T: ?Sized,
    L: Constraint<T>,
    R: Constraint<T, Diagnostic = L::Diagnostic>,
    L::Diagnostic: Send + 'static,
{
    type Diagnostic = L::Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Self::Diagnostic> {
        let left = match self.left.constrain(value) {
            Evaluation::Complete(ValidationResult::Valid(diag)) => Ok(diag),
            Evaluation::Complete(other) => return Evaluation::Complete(other),
            Evaluation::Deferred(future) => Err(future),
        };

        match (left, self.right.constrain(value)) {
            (Ok(diag), Evaluation::Complete(right)) => Evaluation::Complete(conjoin(diag, right)),
            (Ok(diag), Evaluation::Deferred(right)) => {
                Evaluation::defer(async move { conjoin(diag, right.await) })
            }
            (Err(left), right) => {
                let right = right.into_future();
                Evaluation::defer(async move {
                    match left.await {
                        ValidationResult::Valid(diag) => conjoin(diag, right.await),
                        other => other,
                    }
                })
            }
        }
    }
}

fn conjoin<D>(left_diag: Option<D>, right: ValidationResult<D>) -> ValidationResult<D> {
    match right {
        ValidationResult::Valid(diag) => ValidationResult::Valid(diag.or(left_diag)),
        other => other,
    }
}
