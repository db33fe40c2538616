//! Observable validation state.

use serde::{Deserialize, Serialize};

/// Tri-state classification of a property's current value.
///
/// `Unknown` covers everything between "proven valid" and "proven
/// invalid": constraints still running, cancelled runs, and values that
/// were never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationState {
    Unknown,
    Valid,
    Invalid,
}

/// Which observable facet of the validation state changed.
///
/// Passed to change listeners together with the facet's new value, so a
/// single listener can watch all three flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Valid,
    Invalid,
    Validating,
}

/// Handle returned by listener registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
