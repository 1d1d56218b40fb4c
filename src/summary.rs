//! Payload values and the range aggregates kept for every subtree

use std::fmt::Debug;
use std::ops::{Add, AddAssign};

/// An integer payload that can be stored in the treap
///
/// `MIN` and `MAX` double as the identities of the `max` and `min` reductions,
/// so an empty range reports `min == MAX` and `max == MIN`.
pub trait Scalar: Copy + Ord + Debug + Add<Output = Self> + AddAssign {
    const ZERO: Self;
    const MIN: Self;
    const MAX: Self;

    /// `sum` after `delta` has been added to each of `n` values
    ///
    /// The product `delta * n` is formed in `i128`, so only a final sum that
    /// does not fit in `Self` overflows.
    fn shift_sum(sum: Self, delta: Self, n: usize) -> Self;
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const ZERO: Self = 0;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn shift_sum(sum: Self, delta: Self, n: usize) -> Self {
                    let wide = sum as i128 + delta as i128 * n as i128;
                    let narrow = wide as $t;
                    debug_assert_eq!(narrow as i128, wide, "sum overflows {}", stringify!($t));
                    narrow
                }
            }
        )*
    };
}

impl_scalar!(i16, i32, i64, i128, isize);

/// Which reduction a range query should report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Sum,
    Min,
    Max,
}

/// The length, sum, minimum and maximum of a run of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Summary<T> {
    pub len: usize,
    pub sum: T,
    pub min: T,
    pub max: T,
}

impl<T: Scalar> Summary<T> {
    /// The summary of an empty run. Joining with it changes nothing.
    pub const EMPTY: Self = Summary {
        len: 0,
        sum: T::ZERO,
        min: T::MAX,
        max: T::MIN,
    };

    pub fn of(value: T) -> Self {
        Summary {
            len: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    /// Summary of `self` followed by `other`
    pub fn join(self, other: Self) -> Self {
        Summary {
            len: self.len + other.len,
            sum: self.sum + other.sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The summary after `delta` has been added to every value of the run
    pub fn shifted(self, delta: T) -> Self {
        if self.len == 0 {
            return self;
        }
        Summary {
            len: self.len,
            sum: T::shift_sum(self.sum, delta, self.len),
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub fn get(&self, kind: AggregateKind) -> T {
        match kind {
            AggregateKind::Sum => self.sum,
            AggregateKind::Min => self.min,
            AggregateKind::Max => self.max,
        }
    }
}

impl<T: Scalar> Default for Summary<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T: Scalar> FromIterator<T> for Summary<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |acc, value| acc.join(Self::of(value)))
    }
}
