//! String content constraints.

use regex::Regex;

use crate::constraint::{Constraint, Evaluation};
use crate::diagnostic::Diagnostic;
use crate::error::ConstraintError;
use crate::result::ValidationResult;

/// Requires a non-empty string. See [`not_empty`].
pub struct NotEmpty;

/// The string must contain at least one character.
pub fn not_empty() -> NotEmpty {
    NotEmpty
}

impl<T: AsRef<str> + ?Sized> Constraint<T> for NotEmpty {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let result = if value.as_ref().is_empty() {
            ValidationResult::invalid_with(Diagnostic::new("not_empty", "value must not be empty"))
        } else {
            ValidationResult::valid()
        };
        Evaluation::Complete(result)
    }
}

/// Requires a string with at least one non-whitespace character. See
/// [`not_blank`].
pub struct NotBlank;

/// The string must contain at least one non-whitespace character.
pub fn not_blank() -> NotBlank {
    NotBlank
}

impl<T: AsRef<str> + ?Sized> Constraint<T> for NotBlank {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let result = if value.as_ref().trim().is_empty() {
            ValidationResult::invalid_with(Diagnostic::new("not_blank", "value must not be blank"))
        } else {
            ValidationResult::valid()
        };
        Evaluation::Complete(result)
    }
}

/// Requires the string to match a pattern. See [`matches_pattern`].
pub struct MatchesPattern {
    regex: Regex,
}

/// The string must contain a match of `pattern`. Fails at construction
/// time when the pattern does not compile.
pub fn matches_pattern(pattern: &str) -> Result<MatchesPattern, ConstraintError> {
    Ok(MatchesPattern {
        regex: Regex::new(pattern)?,
    })
}

impl MatchesPattern {
    /// Wraps an already-compiled regex.
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl<T: AsRef<str> + ?Sized> Constraint<T> for MatchesPattern {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let result = if self.regex.is_match(value.as_ref()) {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(
                Diagnostic::new("matches_pattern", "value does not match the pattern")
                    .with_param("pattern", self.regex.as_str().to_owned()),
            )
        };
        Evaluation::Complete(result)
    }
}

/// Requires the string not to match a pattern. See
/// [`not_matches_pattern`].
pub struct NotMatchesPattern {
    regex: Regex,
}

/// The string must not contain a match of `pattern`.
pub fn not_matches_pattern(pattern: &str) -> Result<NotMatchesPattern, ConstraintError> {
    Ok(NotMatchesPattern {
        regex: Regex::new(pattern)?,
    })
}

impl NotMatchesPattern {
    /// Wraps an already-compiled regex.
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl<T: AsRef<str> + ?Sized> Constraint<T> for NotMatchesPattern {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let result = if self.regex.is_match(value.as_ref()) {
            ValidationResult::invalid_with(
                Diagnostic::new("not_matches_pattern", "value matches a forbidden pattern")
                    .with_param("pattern", self.regex.as_str().to_owned()),
            )
        } else {
            ValidationResult::valid()
        };
        Evaluation::Complete(result)
    }
}
