use thiserror::Error;

/// Errors raised while constructing a constraint.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// The pattern handed to a pattern constraint does not compile.
    #[error("invalid constraint pattern: {0}")]
    Pattern(#[from] regex::Error),
}
