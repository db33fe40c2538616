//! Size constraints over containers.

use indexmap::IndexMap;

use crate::constraint::{Constraint, Evaluation};
use crate::diagnostic::Diagnostic;
use crate::result::ValidationResult;

/// Containers the size constraints can measure.
pub trait Size {
    fn size(&self) -> usize;
}

impl<E> Size for [E] {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<E> Size for Vec<E> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> Size for IndexMap<K, V, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl Size for str {
    fn size(&self) -> usize {
        self.chars().count()
    }
}

impl Size for String {
    fn size(&self) -> usize {
        self.chars().count()
    }
}

/// Requires at least `min` elements. See [`min_size`].
pub struct MinSize {
    min: usize,
}

/// The container must hold at least `min` elements.
pub fn min_size(min: usize) -> MinSize {
    MinSize { min }
}

impl<T: Size + ?Sized> Constraint<T> for MinSize {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let size = value.size();
        let result = if size >= self.min {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(
                Diagnostic::new("min_size", "too few elements")
                    .with_param("min", self.min.to_string())
                    .with_param("actual", size.to_string()),
            )
        };
        Evaluation::Complete(result)
    }
}

/// Requires at most `max` elements. See [`max_size`].
pub struct MaxSize {
    max: usize,
}

/// The container must hold at most `max` elements.
pub fn max_size(max: usize) -> MaxSize {
    MaxSize { max }
}

impl<T: Size + ?Sized> Constraint<T> for MaxSize {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let size = value.size();
        let result = if size <= self.max {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(
                Diagnostic::new("max_size", "too many elements")
                    .with_param("max", self.max.to_string())
                    .with_param("actual", size.to_string()),
            )
        };
        Evaluation::Complete(result)
    }
}

/// Requires between `min` and `max` elements, both inclusive. See
/// [`size_between`].
pub struct SizeBetween {
    min: usize,
    max: usize,
}

/// The container size must lie in `[min, max]`.
pub fn size_between(min: usize, max: usize) -> SizeBetween {
    SizeBetween { min, max }
}

impl<T: Size + ?Sized> Constraint<T> for SizeBetween {
    type Diagnostic = Diagnostic;

    fn constrain(&self, value: &T) -> Evaluation<Diagnostic> {
        let size = value.size();
        let result = if size >= self.min && size <= self.max {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid_with(
                Diagnostic::new("size_between", "size is out of range")
                    .with_param("min", self.min.to_string())
                    .with_param("max", self.max.to_string())
                    .with_param("actual", size.to_string()),
            )
        };
        Evaluation::Complete(result)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{Constraint, Evaluation, ValidationResult};

    fn check<T, C>(c: &C, value: &T) -> ValidationResult<crate::Diagnostic>
    where
        T: ?Sized,
        C: Constraint<T, Diagnostic = crate::Diagnostic>,
    {
        match c.constrain(value) {
            Evaluation::Complete(result) => result,
            Evaluation::Deferred(_) => panic!("size constraints are synchronous"),
        }
    }

    #[rstest]
    #[case(0, false)]
    #[case(2, true)]
    #[case(3, true)]
    fn min_size_over_slices(#[case] len: usize, #[case] valid: bool) {
        let items = vec![0u8; len];
        assert_eq!(check(&super::min_size(2), items.as_slice()).is_valid(), valid);
    }

    #[test]
    fn size_between_is_inclusive_on_both_ends() {
        let constraint = super::size_between(1, 3);
        assert!(check(&constraint, &vec![1]).is_valid());
        assert!(check(&constraint, &vec![1, 2, 3]).is_valid());

        let result = check(&constraint, &Vec::<i32>::new());
        assert_eq!(result.diagnostic().unwrap().param("actual"), Some("0"));
    }

    #[test]
    fn maps_and_strings_measure_by_entries_and_chars() {
        let mut map = IndexMap::new();
        map.insert("a", 1);
        assert!(check(&super::max_size(1), &map).is_valid());

        // counted in chars, not bytes
        assert!(check(&super::max_size(3), "äöü").is_valid());
    }
}
