//! Per-property diagnostic storage.

use std::fmt;

/// Diagnostics reported by the constraints of one property (or one list
/// or map element).
///
/// Holds at most one diagnostic per constraint, kept in constraint
/// declaration order regardless of completion order, each tagged with
/// whether it came from a valid or an invalid result. A constraint's
/// slot is cleared when a new run for it starts.
pub struct DiagnosticList<D> {
    entries: Vec<Entry<D>>,
}

struct Entry<D> {
    constraint: usize,
    diagnostic: D,
    valid: bool,
}

impl<D> DiagnosticList<D> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Records the diagnostic of constraint `index`, replacing any
    /// previous one.
    pub(crate) fn set(&mut self, index: usize, diagnostic: D, valid: bool) {
        match self.entries.binary_search_by_key(&index, |e| e.constraint) {
            Ok(pos) => {
                self.entries[pos] = Entry { constraint: index, diagnostic, valid };
            }
            Err(pos) => {
                self.entries.insert(pos, Entry { constraint: index, diagnostic, valid });
            }
        }
    }

    /// Drops the diagnostic of constraint `index`, if any.
    pub(crate) fn clear(&mut self, index: usize) {
        if let Ok(pos) = self.entries.binary_search_by_key(&index, |e| e.constraint) {
            self.entries.remove(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All diagnostics, in constraint order.
    pub fn iter(&self) -> impl Iterator<Item = &D> {
        self.entries.iter().map(|e| &e.diagnostic)
    }

    /// Diagnostics attached to valid results.
    pub fn valid(&self) -> impl Iterator<Item = &D> {
        self.entries.iter().filter(|e| e.valid).map(|e| &e.diagnostic)
    }

    /// Diagnostics attached to invalid results.
    pub fn invalid(&self) -> impl Iterator<Item = &D> {
        self.entries.iter().filter(|e| !e.valid).map(|e| &e.diagnostic)
    }
}

impl<D: fmt::Debug> fmt::Debug for DiagnosticList<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (e.constraint, (&e.diagnostic, e.valid))))
            .finish()
    }
}
