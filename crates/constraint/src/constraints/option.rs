//! Presence constraints over optional values.

use crate::constraint::{Constraint, Evaluation};
use crate::diagnostic::Diagnostic;
use crate::result::ValidationResult;

/// Requires an `Option` to hold a value. See [`required`].
pub struct Required;

/// The optional value must be present.
pub fn required() -> Required {
    Required
}

impl<T> Constraint<Option<T>> for Required {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &Option<T>) -> Evaluation<Diagnostic> {
        let result = if value.is_some() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(Diagnostic::new("required", "value is required"))
        };
        Evaluation::Complete(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Constraint, Evaluation, ValidationResult};

    #[test]
    fn present_is_valid_absent_is_not() {
        let required = super::required();

        let Evaluation::Complete(present) = required.constrain(&Some(1)) else {
            panic!("required is synchronous");
        };
        assert!(present.is_valid());

        let Evaluation::Complete(absent) = required.constrain(&None::<i32>) else {
            panic!("required is synchronous");
        };
        assert!(matches!(absent, ValidationResult::Invalid(Some(d)) if d.code() == "required"));
    }
}
