//! List change aggregation.

/// One recorded mutation of the live list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange<E> {
    /// `elements` inserted at `from`.
    Added { from: usize, elements: Vec<E> },
    /// `count` elements removed at `from`.
    Removed { from: usize, count: usize },
    /// `count` elements at `from` replaced by `elements`.
    Replaced { from: usize, count: usize, elements: Vec<E> },
}

/// The merged form of any number of list changes: remove `removed`
/// elements at `from`, then insert `elements` there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacedRange<E> {
    pub from: usize,
    pub removed: usize,
    pub elements: Vec<E>,
}

impl<E> ReplacedRange<E> {
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.elements.is_empty()
    }

    /// Applies the change to `target`.
    pub fn apply_to(&self, target: &mut Vec<E>)
    where
        E: Clone,
    {
        target.splice(self.from..self.from + self.removed, self.elements.iter().cloned());
    }
}

/// Merges recorded changes into a single [`ReplacedRange`] against a
/// base list.
///
/// All indices handed to [`add`](Self::add) are in live-list
/// coordinates; `from`/`remove_size` of the merged change are in base
/// coordinates, where the base is the snapshot the aggregation run
/// started from. Elements between the covered region and a new
/// disjoint change are filled in from the base so the covered region
/// stays contiguous.
#[derive(Debug)]
pub(crate) struct ListChangeAggregator<E> {
    from: Option<usize>,
    remove_size: usize,
    added: Vec<E>,
}

impl<E> Default for ListChangeAggregator<E> {
    fn default() -> Self {
        Self { from: None, remove_size: 0, added: Vec::new() }
    }
}

impl<E: Clone + PartialEq> ListChangeAggregator<E> {
    /// Records one change. `base` must be the same list for the whole
    /// aggregation run.
    pub fn add(&mut self, change: &ListChange<E>, base: &[E]) {
        match change {
            ListChange::Added { from, elements } => self.add_range(*from, elements, base),
            ListChange::Removed { from, count } => self.remove_range(*from, *count, base),
            ListChange::Replaced { from, count, elements } => {
                self.remove_range(*from, *count, base);
                self.add_range(*from, elements, base);
            }
        }
    }

    /// The merged change so far. A run that ends up reproducing the base
    /// list collapses to an empty change.
    pub fn aggregated(&self, base: &[E]) -> ReplacedRange<E> {
        match self.from {
            Some(from)
                if !(self.remove_size == base.len() && self.added.as_slice() == base) =>
            {
                ReplacedRange {
                    from,
                    removed: self.remove_size,
                    elements: self.added.clone(),
                }
            }
            _ => ReplacedRange { from: 0, removed: 0, elements: Vec::new() },
        }
    }

    /// Finishes the run and resets the aggregator. The returned change
    /// must be applied to the base before a new run records changes.
    pub fn complete(&mut self, base: &[E]) -> ReplacedRange<E> {
        let change = self.aggregated(base);
        self.from = None;
        self.remove_size = 0;
        self.added = Vec::new();
        change
    }

    fn add_range(&mut self, c_from: usize, elements: &[E], base: &[E]) {
        let Some(from) = self.from else {
            self.from = Some(c_from);
            self.added.extend_from_slice(elements);
            return;
        };

        if c_from <= from {
            if c_from < from {
                self.remove_size += from - c_from;
            }
            // Splice the new elements, then the base elements they
            // displaced, in front of the covered region.
            let mut prefix = elements.to_vec();
            prefix.extend_from_slice(&base[c_from..from]);
            self.added.splice(0..0, prefix);
            self.from = Some(c_from);
        } else if c_from <= from + self.added.len() {
            // Inside the covered region.
            self.added.splice(c_from - from..c_from - from, elements.iter().cloned());
        } else {
            // Beyond the covered region: extend coverage with the base
            // elements in between.
            let base_index = c_from - self.added.len() + self.remove_size;
            self.added.extend_from_slice(&base[from + self.remove_size..base_index]);
            self.added.extend_from_slice(elements);
            self.remove_size = base_index - from;
        }
    }

    fn remove_range(&mut self, c_from: usize, count: usize, base: &[E]) {
        let mut count = count;
        let Some(from) = self.from else {
            self.from = Some(c_from);
            self.remove_size = count;
            return;
        };

        if c_from < from {
            if c_from + count <= from {
                // Disjoint, left of the covered region: pull the gap
                // between the removal and the region into coverage.
                let gap: Vec<E> = base[c_from + count..from].to_vec();
                self.added.splice(0..0, gap);
                self.remove_size += from - c_from;
            } else {
                // Overlapping: the removal eats base elements on the
                // left, a prefix of `added`, and possibly base elements
                // past the covered region.
                let left = from - c_from;
                let covered = count - left;
                let end = self.added.len().min(covered);
                self.added.drain(0..end);
                let right = covered - end;
                self.remove_size += left + right;
            }
            self.from = Some(c_from);
        } else {
            let start = c_from - from;
            let end = self.added.len().min(start + count);
            if end > start {
                self.added.drain(start..end);
                count -= end - start;
            }

            // Everything to the right of the covered region lives in the
            // base; pull the gap into coverage before growing the removal.
            if let Some(base_index) = (c_from + self.remove_size).checked_sub(self.added.len()) {
                let covered_end = from + self.remove_size;
                if base_index > covered_end {
                    self.added.extend_from_slice(&base[covered_end..base_index]);
                }
                self.remove_size =
                    self.remove_size.max((base_index + count).saturating_sub(from));
            }
        }
    }
}
