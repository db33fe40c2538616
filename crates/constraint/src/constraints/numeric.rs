//! Ordering constraints over comparable values.

use std::fmt::Display;

use crate::constraint::{Constraint, Evaluation};
use crate::diagnostic::Diagnostic;
use crate::result::ValidationResult;

/// Requires `min <= value < max`. See [`between`].
pub struct Between<T> {
    min: T,
    max: T,
}

/// The value must lie in the half-open range `[min, max)`.
pub fn between<T: PartialOrd + Display>(min: T, max: T) -> Between<T> {
    Between { min, max }
}

impl<T: PartialOrd + Display> Constraint<T> for Between<T> {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let result = if *value >= self.min && *value < self.max {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(
                Diagnostic::new("between", "value is out of range")
                    .with_param("min", self.min.to_string())
                    .with_param("max", self.max.to_string())
                    .with_param("actual", value.to_string()),
            )
        };
        Evaluation::Complete(result)
    }
}

macro_rules! ordering_constraint {
    ($(#[$doc:meta])* $name:ident, $factory:ident, $code:literal, $message:literal, $op:tt) => {
        $(#[$doc])*
        pub struct $name<T> {
            bound: T,
        }

        #[doc = concat!("The value must be ", $message, " the bound.")]
        pub fn $factory<T: PartialOrd + Display>(bound: T) -> $name<T> {
            $name { bound }
        }

        impl<T: PartialOrd + Display> Constraint<T> for $name<T> {
            type Diagnostic = Diagnostic;

            fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
                let result = if *value $op self.bound {
                    ValidationResult::valid()
                } else {
                    ValidationResult::invalid_with(
                        Diagnostic::new($code, concat!("value must be ", $message, " the bound"))
                            .with_param("bound", self.bound.to_string())
                            .with_param("actual", value.to_string()),
                    )
                };
                Evaluation::Complete(result)
            }
        }
    };
}

ordering_constraint!(
    /// Requires `value > bound`. See [`greater_than`].
    GreaterThan, greater_than, "greater_than", "greater than", >
);
ordering_constraint!(
    /// Requires `value >= bound`. See [`greater_than_or_equal`].
    GreaterThanOrEqual, greater_than_or_equal, "greater_than_or_equal", "greater than or equal to", >=
);
ordering_constraint!(
    /// Requires `value < bound`. See [`less_than`].
    LessThan, less_than, "less_than", "less than", <
);
ordering_constraint!(
    /// Requires `value <= bound`. See [`less_than_or_equal`].
    LessThanOrEqual, less_than_or_equal, "less_than_or_equal", "less than or equal to", <=
);
