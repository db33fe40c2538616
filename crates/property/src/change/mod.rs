//! Change records and aggregation for container properties.
//!
//! Container snapshots are not rebuilt from scratch on commit; the
//! mutations that happened since the last commit are recorded and merged
//! into one minimal change, which is applied to the snapshot when the
//! property settles valid. Merging is what keeps invalid intermediate
//! elements from ever surfacing in the snapshot: an element added and
//! later removed is absent from the merged change.

mod list;
mod map;

pub use list::{ListChange, ReplacedRange};
pub(crate) use list::ListChangeAggregator;
pub(crate) use map::MapChangeAggregator;
