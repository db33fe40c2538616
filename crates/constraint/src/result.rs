//! Outcome of a single constraint evaluation.

use serde::{Deserialize, Serialize};

/// The outcome of evaluating one constraint against one value.
///
/// Both valid and invalid outcomes may carry a diagnostic of the
/// user-chosen type `D`. The third variant, [`ValidationResult::None`],
/// stands for a run that produced no result at all: returning it cancels
/// the run without changing the recorded state of the constraint. An
/// asynchronous constraint typically yields `None` when it notices its
/// input has become irrelevant (a remote lookup that was aborted, say).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult<D> {
    /// The value satisfies the constraint.
    Valid(Option<D>),
    /// The value violates the constraint.
    Invalid(Option<D>),
    /// The run completed without producing a result.
    None,
}

impl<D> ValidationResult<D> {
    /// A valid result with no diagnostic.
    pub const fn valid() -> Self {
        Self::Valid(None)
    }

    /// A valid result carrying a diagnostic.
    pub fn valid_with(diagnostic: D) -> Self {
        Self::Valid(Some(diagnostic))
    }

    /// An invalid result with no diagnostic.
    pub const fn invalid() -> Self {
        Self::Invalid(None)
    }

    /// An invalid result carrying a diagnostic.
    pub fn invalid_with(diagnostic: D) -> Self {
        Self::Invalid(Some(diagnostic))
    }

    /// A result that cancels the run.
    pub const fn none() -> Self {
        Self::None
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub const fn diagnostic(&self) -> Option<&D> {
        match self {
            Self::Valid(d) | Self::Invalid(d) => d.as_ref(),
            Self::None => None,
        }
    }

    pub fn into_diagnostic(self) -> Option<D> {
        match self {
            Self::Valid(d) | Self::Invalid(d) => d,
            Self::None => None,
        }
    }

    /// Collapses the cancellation sentinel into `Option::None`.
    pub fn into_option(self) -> Option<Self> {
        match self {
            Self::None => None,
            other => Some(other),
        }
    }
}
