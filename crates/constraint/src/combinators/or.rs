use crate::constraint::{Constraint, Evaluation};
use crate::result::ValidationResult;

/// Disjunction of two constraints. See [`ConstraintExt::or`].
///
/// A valid or cancelled left result short-circuits. When both sides are
/// invalid, the right side's diagnostic wins, falling back to the left
/// one.
///
/// [`ConstraintExt::or`]: crate::ConstraintExt::or
pub struct Or<L, R> {
    left: L,
    right: R,
}

impl<L, R> Or<L, R> {
    pub(crate) fn new(left: L, right: R) -> Self {
        Self { left, right }
    }
}

impl<T, L, R> Constraint<T> for Or<L, R>
where
    T: ?Sized,
    L: Constraint<T>,
    R: Constraint<T, Diagnostic = L::Diagnostic>,
    L::Diagnostic: Send + 'static,
{
    type Diagnostic = L::Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Self::Diagnostic> {
        let left = match self.left.constrain(value) {
            Evaluation::Complete(ValidationResult::Invalid(diag)) => Ok(diag),
            Evaluation::Complete(other) => return Evaluation::Complete(other),
            Evaluation::Deferred(future) => Err(future),
        };

        match (left, self.right.constrain(value)) {
            (Ok(diag), Evaluation::Complete(right)) => Evaluation::Complete(disjoin(diag, right)),
            (Ok(diag), Evaluation::Deferred(right)) => {
                Evaluation::defer(async move { disjoin(diag, right.await) })
            }
            (Err(left), right) => {
                let right = right.into_future();
                Evaluation::defer(async move {
                    match left.await {
                        ValidationResult::Invalid(diag) => disjoin(diag, right.await),
                        other => other,
                    }
                })
            }
        }
    }
}

fn disjoin<D>(left_diag: Option<D>, right: ValidationResult<D>) -> ValidationResult<D> {
    match right {
        ValidationResult::Invalid(diag) => ValidationResult::Invalid(diag.or(left_diag)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use crate::{Constraint, ConstraintExt, Evaluation, ValidationResult, from_fn};

    fn check<C: Constraint<i32, Diagnostic = &'static str>>(c: &C, n: i32) -> ValidationResult<&'static str> {
        match c.constrain(&n) {
            Evaluation::Complete(result) => result,
            Evaluation::Deferred(_) => panic!("expected a complete evaluation"),
        }
    }

    fn equals(target: i32) -> impl Constraint<i32, Diagnostic = &'static str> {
        from_fn(move |n: &i32| {
            if *n == target {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid_with("mismatch")
            }
        })
    }

    #[test]
    fn either_valid_is_valid() {
        let one_or_two = equals(1).or(equals(2));
        assert!(check(&one_or_two, 1).is_valid());
        assert!(check(&one_or_two, 2).is_valid());
        assert_eq!(check(&one_or_two, 3), ValidationResult::invalid_with("mismatch"));
    }

    #[test]
    fn valid_left_short_circuits() {
        let evaluated = Cell::new(false);
        let right = from_fn(|_: &i32| {
            evaluated.set(true);
            ValidationResult::<&'static str>::valid()
        });

        assert!(check(&equals(1).or(right), 1).is_valid());
        assert!(!evaluated.get());
    }

    #[test]
    fn cancelled_operand_cancels_the_run() {
        let cancel = || from_fn(|_: &i32| ValidationResult::<&'static str>::none());
        assert!(check(&cancel().or(equals(1)), 1).is_none());
        assert!(check(&equals(2).or(cancel()), 1).is_none());
    }
}
