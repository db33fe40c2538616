use crate::constraint::{Constraint, Evaluation};
use crate::result::ValidationResult;

/// Conditional application of a constraint. See [`ConstraintExt::when`].
///
/// When the predicate rejects the value, the constraint is skipped and
/// the value counts as valid with no diagnostic.
///
/// [`ConstraintExt::when`]: crate::ConstraintExt::when
pub struct When<C, P> {
    inner: C,
    predicate: P,
}

impl<C, P> When<C, P> {
    pub(crate) fn new(inner: C, predicate: P) -> Self {
        Self { inner, predicate }
    }
}

impl<T, C, P> Constraint<T> for When<C, P>
where
    T: ?Sized,
    C: Constraint<T>,
    P: Fn(&T) -> bool,
{
    type Diagnostic = C::Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Self::Diagnostic> {
        if (self.predicate)(value) {
            self.inner.constrain(value)
        } else {
            Evaluation::Complete(ValidationResult::valid())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{Constraint, ConstraintExt, Evaluation, ValidationResult, from_fn};

    #[test]
    fn skips_when_predicate_is_false() {
        let never_valid = from_fn(|_: &i32| ValidationResult::<&'static str>::invalid());
        let only_positive = never_valid.when(|n: &i32| *n > 0);

        let Evaluation::Complete(skipped) = only_positive.constrain(&-5) else {
            panic!("expected a complete evaluation");
        };
        assert_eq!(skipped, ValidationResult::valid());

        let Evaluation::Complete(applied) = only_positive.constrain(&5) else {
            panic!("expected a complete evaluation");
        };
        assert!(applied.is_invalid());
    }
}
