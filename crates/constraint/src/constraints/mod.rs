//! Built-in constraints.
//!
//! Every built-in produces the default [`Diagnostic`] and allocates only
//! on the failure path; a passing value yields `Valid` with no
//! diagnostic.
//!
//! [`Diagnostic`]: crate::Diagnostic

mod collection;
mod numeric;
mod option;
mod string;

pub use collection::{MaxSize, MinSize, Size, SizeBetween, max_size, min_size, size_between};
pub use numeric::{
    Between, GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual, between, greater_than,
    greater_than_or_equal, less_than, less_than_or_equal,
};
pub use option::{Required, required};
pub use string::{
    MatchesPattern, NotBlank, NotEmpty, NotMatchesPattern, matches_pattern, not_blank, not_empty,
    not_matches_pattern,
};
